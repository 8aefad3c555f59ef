//! Magnifier inset with crosshair and color readout

use tiny_skia::{
    FillRule, FilterQuality, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke,
    Transform,
};

use super::compositor::{Frame, Style, TextLabel};
use crate::capture::sampler::{ColorFormat, ColorSample};
use crate::domain::DisplayPoint;
use crate::session::state::LoadedCapture;

/// Height of the color info strip at the bottom of the magnifier
pub const INFO_STRIP_HEIGHT: f32 = 40.0;
/// Side of the color swatch inside the info strip
pub const SWATCH_SIZE: f32 = 20.0;
/// Half-length of each crosshair arm
pub const CROSSHAIR_ARM: f32 = 10.0;
/// Magnifier outline width
pub const BORDER_WIDTH: f32 = 3.0;

/// Where the magnifier sits on the surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MagnifierLayout {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

impl MagnifierLayout {
    /// Anchor the magnifier to the top-right corner of the surface
    pub fn top_right(surface_width: f32, size: f32, margin: f32) -> Self {
        Self {
            x: surface_width - size - margin,
            y: margin,
            size,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.size / 2.0, self.y + self.size / 2.0)
    }

    pub fn radius(&self) -> f32 {
        self.size / 2.0
    }
}

/// Color readout shown under the crosshair
pub struct Readout<'a> {
    pub color: Option<&'a ColorSample>,
    pub format: ColorFormat,
    pub copied: bool,
}

/// Draw the zoomed view of the source around the pointer's source pixel
pub fn draw_magnifier(
    frame: &mut Frame,
    capture: &LoadedCapture,
    pointer: DisplayPoint,
    readout: Readout<'_>,
    style: &Style,
) {
    let layout = MagnifierLayout::top_right(
        frame.pixmap.width() as f32,
        style.magnifier_size,
        style.magnifier_margin,
    );
    let (cx, cy) = layout.center();
    let Some(circle) = PathBuilder::from_circle(cx, cy, layout.radius()) else {
        return;
    };
    let Some(mut clip) = Mask::new(frame.pixmap.width(), frame.pixmap.height()) else {
        return;
    };
    clip.fill_path(&circle, FillRule::Winding, true, Transform::identity());

    // Dark backing shows wherever the zoomed area runs past the bitmap
    let mut backing = Paint::default();
    backing.set_color_rgba8(0, 0, 0, 230);
    frame
        .pixmap
        .fill_path(&circle, &backing, FillRule::Winding, Transform::identity(), Some(&clip));

    draw_zoomed_source(&mut frame.pixmap, capture, pointer, &layout, style, &clip);

    if let Some(color) = readout.color {
        draw_info_strip(frame, &layout, color, readout.format, &clip);
    }

    draw_crosshair(&mut frame.pixmap, cx, cy);

    let mut border = Paint::default();
    border.anti_alias = true;
    if readout.copied {
        border.set_color(style.copied_color);
    } else {
        border.set_color_rgba8(255, 255, 255, 204);
    }
    let stroke = Stroke {
        width: BORDER_WIDTH,
        ..Default::default()
    };
    frame
        .pixmap
        .stroke_path(&circle, &border, &stroke, Transform::identity(), None);
}

/// Blit the source so the pointer's source pixel is centered in the magnifier
fn draw_zoomed_source(
    pixmap: &mut Pixmap,
    capture: &LoadedCapture,
    pointer: DisplayPoint,
    layout: &MagnifierLayout,
    style: &Style,
    clip: &Mask,
) {
    let scale = capture.mapper.scale();
    let src = capture.mapper.to_source(pointer);
    let (cx, cy) = layout.center();

    // Display pixels per source pixel inside the inset
    let kx = style.magnifier_zoom / scale.x;
    let ky = style.magnifier_zoom / scale.y;
    let center_x = src.x as f32 + 0.5;
    let center_y = src.y as f32 + 0.5;
    let transform = Transform::from_row(kx, 0.0, 0.0, ky, cx - center_x * kx, cy - center_y * ky);

    let paint = PixmapPaint {
        quality: FilterQuality::Nearest,
        ..Default::default()
    };
    pixmap.draw_pixmap(
        0,
        0,
        capture.source.pixmap().as_ref(),
        &paint,
        transform,
        Some(clip),
    );
}

fn draw_info_strip(
    frame: &mut Frame,
    layout: &MagnifierLayout,
    color: &ColorSample,
    format: ColorFormat,
    clip: &Mask,
) {
    let strip_top = layout.y + layout.size - INFO_STRIP_HEIGHT;
    if let Some(strip) = Rect::from_xywh(layout.x, strip_top, layout.size, INFO_STRIP_HEIGHT) {
        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 178);
        frame
            .pixmap
            .fill_rect(strip, &paint, Transform::identity(), Some(clip));
    }

    if let Some(swatch) = Rect::from_xywh(layout.x + 10.0, strip_top + 10.0, SWATCH_SIZE, SWATCH_SIZE)
    {
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, 255);
        frame
            .pixmap
            .fill_rect(swatch, &paint, Transform::identity(), Some(clip));
    }

    frame.labels.push(TextLabel::new(
        color.text(format),
        layout.x + 40.0,
        strip_top + 25.0,
    ));
}

fn draw_crosshair(pixmap: &mut Pixmap, cx: f32, cy: f32) {
    let mut pb = PathBuilder::new();
    pb.move_to(cx - CROSSHAIR_ARM, cy);
    pb.line_to(cx + CROSSHAIR_ARM, cy);
    pb.move_to(cx, cy - CROSSHAIR_ARM);
    pb.line_to(cx, cy + CROSSHAIR_ARM);
    let Some(path) = pb.finish() else {
        return;
    };

    let mut paint = Paint::default();
    paint.set_color_rgba8(255, 0, 0, 255);
    let stroke = Stroke {
        width: 1.0,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_anchors_top_right() {
        let layout = MagnifierLayout::top_right(1500.0, 160.0, 20.0);
        assert_eq!((layout.x, layout.y), (1320.0, 20.0));
        assert_eq!(layout.center(), (1400.0, 100.0));
        assert_eq!(layout.radius(), 80.0);
    }
}
