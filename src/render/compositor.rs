//! Scene compositor for the capture overlay
//!
//! Each pass paints onto a fresh surface, in order:
//! 1. the source image scaled to fill the surface
//! 2. the dark backdrop mask
//! 3. the selection cutout, re-blitted from the source (never cleared) plus its outline
//! 4. the magnifier inset
//! 5. the size label next to the selection
//!
//! Text is not rasterized here. Label backgrounds are painted and the text runs are
//! returned in [`Frame::labels`] for the host's text renderer.

use tiny_skia::{
    Color, FillRule, FilterQuality, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke,
    Transform,
};

use super::magnifier::{self, Readout};
use crate::config::OverlayConfig;
use crate::domain::DisplayRect;
use crate::session::state::{LoadedCapture, Session};

/// Font size the host should use for label text
pub const LABEL_FONT_SIZE: f32 = 14.0;
/// Estimated horizontal advance per character at [`LABEL_FONT_SIZE`]
pub const LABEL_GLYPH_ADVANCE: f32 = 8.0;
/// Selection outline width
pub const SELECTION_STROKE_WIDTH: f32 = 2.0;

/// A text run to be drawn by the host, positioned at its baseline origin
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: [u8; 4],
}

impl TextLabel {
    pub fn new(text: &str, x: f32, y: f32) -> Self {
        Self {
            text: text.to_string(),
            x,
            y,
            size: LABEL_FONT_SIZE,
            color: [255, 255, 255, 255],
        }
    }
}

pub fn estimate_text_width(text: &str) -> f32 {
    text.chars().count() as f32 * LABEL_GLYPH_ADVANCE
}

/// Output of one compositor pass
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixmap: Pixmap,
    pub labels: Vec<TextLabel>,
}

impl Frame {
    /// Straight-alpha copy of the surface, e.g. for saving
    pub fn to_rgba(&self) -> image::RgbaImage {
        let mut img = image::RgbaImage::new(self.pixmap.width(), self.pixmap.height());
        for (dst, src) in img.pixels_mut().zip(self.pixmap.pixels()) {
            let c = src.demultiply();
            dst.0 = [c.red(), c.green(), c.blue(), c.alpha()];
        }
        img
    }
}

/// Visual parameters resolved from the config
#[derive(Debug, Clone)]
pub struct Style {
    pub magnifier_enabled: bool,
    pub magnifier_size: f32,
    pub magnifier_zoom: f32,
    pub magnifier_margin: f32,
    pub mask_alpha: u8,
    pub accent_color: Color,
    pub copied_color: Color,
}

impl From<&OverlayConfig> for Style {
    fn from(config: &OverlayConfig) -> Self {
        Self {
            magnifier_enabled: config.magnifier_enabled,
            magnifier_size: config.magnifier_size,
            magnifier_zoom: config.magnifier_zoom,
            magnifier_margin: config.magnifier_margin,
            mask_alpha: (config.mask_opacity.clamp(0.0, 1.0) * 255.0).round() as u8,
            accent_color: config.accent_color.to_skia(),
            copied_color: config.copied_color.to_skia(),
        }
    }
}

pub struct Compositor {
    style: Style,
}

impl Compositor {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            style: Style::from(config),
        }
    }

    /// Paint the whole scene for the current session snapshot
    ///
    /// Returns `None` only if the surface cannot be allocated.
    pub fn render(&self, session: &Session) -> Option<Frame> {
        let (width, height) = session.display_size();
        let Some(pixmap) = Pixmap::new(width, height) else {
            log::warn!("Cannot allocate {}x{} overlay surface", width, height);
            return None;
        };
        let mut frame = Frame {
            pixmap,
            labels: Vec::new(),
        };

        let capture = session.capture();
        if let Some(capture) = capture {
            draw_source(&mut frame.pixmap, capture, None);
        }

        self.draw_mask(&mut frame.pixmap);

        let selection = session.selection().filter(|rect| !rect.is_degenerate());
        if let Some(rect) = selection {
            if let Some(capture) = capture {
                draw_cutout(&mut frame.pixmap, capture, rect);
            }
            self.draw_outline(&mut frame.pixmap, rect);
        }

        if self.style.magnifier_enabled
            && let (Some(capture), Some(pointer)) = (capture, session.pointer())
        {
            let readout = Readout {
                color: session.color(),
                format: session.color_format(),
                copied: session.copy_feedback(),
            };
            magnifier::draw_magnifier(&mut frame, capture, pointer, readout, &self.style);
        }

        if let (Some(rect), Some(capture)) = (selection, capture) {
            draw_size_indicator(&mut frame, capture, rect);
        }

        Some(frame)
    }

    fn draw_mask(&self, pixmap: &mut Pixmap) {
        let Some(rect) = Rect::from_xywh(0.0, 0.0, pixmap.width() as f32, pixmap.height() as f32)
        else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, self.style.mask_alpha);
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn draw_outline(&self, pixmap: &mut Pixmap, rect: DisplayRect) {
        let Some(r) = Rect::from_xywh(rect.x, rect.y, rect.width, rect.height) else {
            return;
        };
        let path = PathBuilder::from_rect(r);
        let mut paint = Paint::default();
        paint.set_color(self.style.accent_color);
        paint.anti_alias = true;
        let stroke = Stroke {
            width: SELECTION_STROKE_WIDTH,
            ..Default::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

/// Transform that fits the whole source onto the surface
fn source_to_surface(capture: &LoadedCapture) -> Transform {
    let scale = capture.mapper.scale();
    Transform::from_scale(1.0 / scale.x, 1.0 / scale.y)
}

/// Draw the unmasked source with the background transform, optionally clipped
fn draw_source(pixmap: &mut Pixmap, capture: &LoadedCapture, clip: Option<&Mask>) {
    let paint = PixmapPaint {
        quality: FilterQuality::Nearest,
        ..Default::default()
    };
    pixmap.draw_pixmap(
        0,
        0,
        capture.source.pixmap().as_ref(),
        &paint,
        source_to_surface(capture),
        clip,
    );
}

/// Paint the source over the mask inside the selection
///
/// Same transform as the background layer, so the cutout lines up with it pixel for pixel.
fn draw_cutout(pixmap: &mut Pixmap, capture: &LoadedCapture, rect: DisplayRect) {
    let Some(r) = Rect::from_xywh(rect.x, rect.y, rect.width, rect.height) else {
        return;
    };
    let Some(mut clip) = Mask::new(pixmap.width(), pixmap.height()) else {
        return;
    };
    clip.fill_path(
        &PathBuilder::from_rect(r),
        FillRule::Winding,
        false,
        Transform::identity(),
    );
    draw_source(pixmap, capture, Some(&clip));
}

/// Label text for the selection size, in the source pixels a commit would cover
pub fn size_text(capture: &LoadedCapture, rect: DisplayRect) -> String {
    let (width, height) = capture
        .source_rect(rect)
        .map_or((0, 0), |src| (src.width(), src.height()));
    format!("{} x {}", width, height)
}

/// Baseline origin of the size label, flipped away from the right/bottom edges
pub fn size_label_origin(rect: DisplayRect, text_width: f32, surface: (f32, f32)) -> (f32, f32) {
    let mut x = rect.right() + 5.0;
    let mut y = rect.bottom() + 20.0;
    if x + text_width + 5.0 > surface.0 {
        x = rect.x - text_width - 5.0;
    }
    if y + 5.0 > surface.1 {
        y = rect.y - 10.0;
    }
    (x, y)
}

fn draw_size_indicator(frame: &mut Frame, capture: &LoadedCapture, rect: DisplayRect) {
    let text = size_text(capture, rect);
    let text_width = estimate_text_width(&text);
    let surface = (frame.pixmap.width() as f32, frame.pixmap.height() as f32);
    let (x, y) = size_label_origin(rect, text_width, surface);

    if let Some(bg) = Rect::from_xywh(x - 5.0, y - 15.0, text_width + 10.0, 20.0) {
        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 178);
        frame
            .pixmap
            .fill_rect(bg, &paint, Transform::identity(), None);
    }
    frame.labels.push(TextLabel::new(&text, x, y));
}
