//! Geometric types for display-space and source-space coordinates

/// A point on the display surface, in CSS pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplayPoint {
    pub x: f32,
    pub y: f32,
}

impl DisplayPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A pixel address in the native-resolution source bitmap
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SourcePoint {
    pub x: i32,
    pub y: i32,
}

impl SourcePoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Integer rectangle in source pixels, right/bottom exclusive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl SourceRect {
    /// Create a new rectangle from coordinates
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Calculate the intersection of two rectangles
    pub fn intersect(&self, other: SourceRect) -> Option<SourceRect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);
        if left < right && top < bottom {
            Some(SourceRect {
                left,
                top,
                right,
                bottom,
            })
        } else {
            None
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Region handed to the host, in floating source-pixel units
    pub fn to_capture_region(self) -> CaptureRegion {
        CaptureRegion {
            x: self.left as f64,
            y: self.top as f64,
            width: self.width() as f64,
            height: self.height() as f64,
        }
    }
}

/// Normalized rectangle in display space (non-negative width/height)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplayRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayRect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// A rectangle with zero area on either axis draws nothing
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn top_left(&self) -> DisplayPoint {
        DisplayPoint::new(self.x, self.y)
    }

    pub fn bottom_right(&self) -> DisplayPoint {
        DisplayPoint::new(self.right(), self.bottom())
    }
}

/// Rectangle being dragged out by the user, in display space
///
/// The anchor is where the primary button went down and the current corner follows the
/// pointer. Readers always go through [`SelectionRect::normalized`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SelectionRect {
    pub anchor_x: f32,
    pub anchor_y: f32,
    pub current_x: f32,
    pub current_y: f32,
}

impl SelectionRect {
    /// Start a selection with both corners at the same point
    pub fn at(p: DisplayPoint) -> Self {
        Self {
            anchor_x: p.x,
            anchor_y: p.y,
            current_x: p.x,
            current_y: p.y,
        }
    }

    pub fn update(&mut self, p: DisplayPoint) {
        self.current_x = p.x;
        self.current_y = p.y;
    }

    pub fn normalized(&self) -> DisplayRect {
        let (min_x, min_y, max_x, max_y) =
            normalize_rect(self.anchor_x, self.anchor_y, self.current_x, self.current_y);
        DisplayRect {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }
}

/// Selection handed to the host on commit, in native source pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Normalize min/max coordinates from arbitrary start/end points
#[inline]
pub fn normalize_rect(x1: f32, y1: f32, x2: f32, y2: f32) -> (f32, f32, f32, f32) {
    let (min_x, max_x) = if x1 < x2 { (x1, x2) } else { (x2, x1) };
    let (min_y, max_y) = if y1 < y2 { (y1, y2) } else { (y2, y1) };
    (min_x, min_y, max_x, max_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_handles_reverse_drag() {
        let mut sel = SelectionRect::at(DisplayPoint::new(200.0, 150.0));
        sel.update(DisplayPoint::new(100.0, 100.0));
        let rect = sel.normalized();
        assert_eq!(
            rect,
            DisplayRect {
                x: 100.0,
                y: 100.0,
                width: 100.0,
                height: 50.0
            }
        );
    }

    #[test]
    fn test_fresh_selection_is_degenerate() {
        let sel = SelectionRect::at(DisplayPoint::new(42.0, 7.0));
        assert!(sel.normalized().is_degenerate());
    }

    #[test]
    fn test_source_rect_intersect() {
        let a = SourceRect::new(0, 0, 10, 10);
        let b = SourceRect::new(5, 5, 20, 20);
        assert_eq!(a.intersect(b), Some(SourceRect::new(5, 5, 10, 10)));
        assert_eq!(a.intersect(SourceRect::new(10, 0, 12, 10)), None);
    }
}
