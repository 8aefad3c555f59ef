//! Display-space to source-space coordinate mapping

use anyhow::bail;

use super::geometry::{DisplayPoint, DisplayRect, SourcePoint, SourceRect};

/// Native pixels per display pixel, fixed once the source image is loaded
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleFactor {
    pub x: f32,
    pub y: f32,
}

/// Converts between the overlay surface and the captured bitmap
///
/// A mapper only exists for a loaded image, so every conversion has a valid scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    scale: ScaleFactor,
    native_size: (u32, u32),
    display_size: (u32, u32),
}

impl CoordinateMapper {
    pub fn new(native_size: (u32, u32), display_size: (u32, u32)) -> anyhow::Result<Self> {
        let (nw, nh) = native_size;
        let (dw, dh) = display_size;
        if nw == 0 || nh == 0 {
            bail!("source image has no pixels ({}x{})", nw, nh);
        }
        if dw == 0 || dh == 0 {
            bail!("display surface has no area ({}x{})", dw, dh);
        }
        let scale = ScaleFactor {
            x: nw as f32 / dw as f32,
            y: nh as f32 / dh as f32,
        };
        log::debug!(
            "Coordinate mapper: native {}x{}, display {}x{}, scale {:.3}x{:.3}",
            nw,
            nh,
            dw,
            dh,
            scale.x,
            scale.y
        );
        Ok(Self {
            scale,
            native_size,
            display_size,
        })
    }

    pub fn scale(&self) -> ScaleFactor {
        self.scale
    }

    pub fn native_size(&self) -> (u32, u32) {
        self.native_size
    }

    pub fn display_size(&self) -> (u32, u32) {
        self.display_size
    }

    /// Map a display point to the source pixel underneath it (floored)
    pub fn to_source(&self, p: DisplayPoint) -> SourcePoint {
        SourcePoint {
            x: (p.x * self.scale.x).floor() as i32,
            y: (p.y * self.scale.y).floor() as i32,
        }
    }

    /// Map a source pixel back to display space, for drawing only
    pub fn to_display(&self, p: SourcePoint) -> DisplayPoint {
        DisplayPoint {
            x: p.x as f32 / self.scale.x,
            y: p.y as f32 / self.scale.y,
        }
    }

    /// Map a normalized display rectangle to source pixels by flooring both corners
    ///
    /// Adjacent display rectangles share their edge pixel column/row, so masked and
    /// unmasked regions never leave a seam.
    pub fn rect_to_source(&self, rect: DisplayRect) -> SourceRect {
        let tl = self.to_source(rect.top_left());
        let br = self.to_source(rect.bottom_right());
        SourceRect::new(tl.x, tl.y, br.x, br.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sizes_fail_fast() {
        assert!(CoordinateMapper::new((0, 10), (10, 10)).is_err());
        assert!(CoordinateMapper::new((10, 10), (10, 0)).is_err());
    }

    #[test]
    fn test_to_source_floors() {
        let mapper = CoordinateMapper::new((3000, 2000), (1500, 1000)).unwrap();
        assert_eq!(mapper.to_source(DisplayPoint::new(100.0, 100.0)), SourcePoint::new(200, 200));
        assert_eq!(mapper.to_source(DisplayPoint::new(10.7, 3.2)), SourcePoint::new(21, 6));
    }

    #[test]
    fn test_fractional_scale_floors() {
        // 1.25x display scaling
        let mapper = CoordinateMapper::new((2400, 1350), (1920, 1080)).unwrap();
        assert_eq!(mapper.to_source(DisplayPoint::new(3.0, 3.0)), SourcePoint::new(3, 3));
        assert_eq!(mapper.to_source(DisplayPoint::new(4.0, 4.0)), SourcePoint::new(5, 5));
    }

    #[test]
    fn test_round_trip_within_one_scale_unit() {
        let mapper = CoordinateMapper::new((2400, 1350), (1920, 1080)).unwrap();
        let scale = mapper.scale();
        let mut x = 0.0f32;
        while x < 1920.0 {
            let y = x * 0.5625;
            let p = DisplayPoint::new(x, y);
            let back = mapper.to_display(mapper.to_source(p));
            assert!((p.x - back.x).abs() <= scale.x, "x drift at {:?}", p);
            assert!((p.y - back.y).abs() <= scale.y, "y drift at {:?}", p);
            x += 7.3;
        }
    }

    #[test]
    fn test_rect_to_source() {
        let mapper = CoordinateMapper::new((3000, 2000), (1500, 1000)).unwrap();
        let rect = DisplayRect {
            x: 100.0,
            y: 100.0,
            width: 100.0,
            height: 50.0,
        };
        assert_eq!(mapper.rect_to_source(rect), SourceRect::new(200, 200, 400, 300));
    }
}
