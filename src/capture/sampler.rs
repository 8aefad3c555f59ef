//! Pixel-accurate color picking from the sampling buffer

use serde::{Deserialize, Serialize};

use super::image::SamplingBuffer;
use crate::domain::SourcePoint;

/// Text representation used for the color readout and for copying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorFormat {
    #[default]
    Hex,
    Rgb,
}

impl ColorFormat {
    /// Get the other format
    pub fn toggled(self) -> Self {
        match self {
            ColorFormat::Hex => ColorFormat::Rgb,
            ColorFormat::Rgb => ColorFormat::Hex,
        }
    }
}

/// Color of one source pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// `#RRGGBB`, uppercase
    pub hex: String,
    /// `rgb(r, g, b)`
    pub rgb: String,
}

impl ColorSample {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r,
            g,
            b,
            hex: format!("#{:02X}{:02X}{:02X}", r, g, b),
            rgb: format!("rgb({}, {}, {})", r, g, b),
        }
    }

    pub fn text(&self, format: ColorFormat) -> &str {
        match format {
            ColorFormat::Hex => &self.hex,
            ColorFormat::Rgb => &self.rgb,
        }
    }
}

/// Read the color under a source pixel, `None` outside the bitmap
pub fn sample(buffer: &SamplingBuffer, p: SourcePoint) -> Option<ColorSample> {
    let [r, g, b, _] = buffer.pixel(p.x, p.y)?;
    Some(ColorSample::from_rgb(r, g, b))
}
