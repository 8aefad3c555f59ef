//! Configuration persistence for overlay settings

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::capture::sampler::ColorFormat;

/// Serializable color representation for config storage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "default_alpha")]
    pub a: f32,
}

fn default_alpha() -> f32 {
    1.0
}

impl OverlayColor {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Convert to 8-bit RGBA (0-255)
    pub fn to_rgba_u8(self) -> [u8; 4] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.a.clamp(0.0, 1.0) * 255.0).round() as u8,
        ]
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        let [r, g, b, a] = self.to_rgba_u8();
        tiny_skia::Color::from_rgba8(r, g, b, a)
    }
}

/// Overlay configuration persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Whether to show the magnifier inset
    pub magnifier_enabled: bool,
    /// Magnifier diameter in display pixels
    pub magnifier_size: f32,
    /// Display pixels drawn per display pixel of source content
    pub magnifier_zoom: f32,
    /// Distance of the magnifier from the top-right corner
    pub magnifier_margin: f32,
    /// Opacity of the dark backdrop mask (0.0-1.0)
    pub mask_opacity: f32,
    /// Selection outline color
    pub accent_color: OverlayColor,
    /// Magnifier border color right after a color copy
    pub copied_color: OverlayColor,
    /// How long the copy feedback stays visible
    pub copy_feedback_ms: u64,
    /// Selections narrower or shorter than this (display pixels) cancel; never below 10
    pub min_selection_size: f32,
    /// Initial color readout format
    pub color_format: ColorFormat,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            magnifier_enabled: true,
            magnifier_size: 160.0,
            magnifier_zoom: 2.0,
            magnifier_margin: 20.0,
            mask_opacity: 0.5,
            accent_color: OverlayColor::rgba(97.0 / 255.0, 175.0 / 255.0, 239.0 / 255.0, 0.9),
            copied_color: OverlayColor::rgba(76.0 / 255.0, 217.0 / 255.0, 100.0 / 255.0, 1.0),
            copy_feedback_ms: 300,
            min_selection_size: 10.0,
            color_format: ColorFormat::Hex,
        }
    }
}

impl OverlayConfig {
    /// Application directory name under the user config dir
    pub const ID: &'static str = "regionshot";

    /// Default location of the config file
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(Self::ID).join("overlay.json"))
    }

    /// Load configuration from disk, or return defaults if unavailable
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => {
                log::warn!("Could not resolve config directory, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::read(path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Error loading config, using defaults: {:?}", err);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) {
        let Some(path) = Self::path() else {
            log::error!("Could not resolve config directory for saving");
            return;
        };
        if let Err(err) = self.save_to(&path) {
            log::error!("Failed to save config: {:?}", err);
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = OverlayConfig::load_from(&dir.path().join("nope.json"));
        assert_eq!(config, OverlayConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.json");
        std::fs::write(&path, r#"{ "min_selection_size": 24.0, "color_format": "rgb" }"#).unwrap();
        let config = OverlayConfig::load_from(&path);
        assert_eq!(config.min_selection_size, 24.0);
        assert_eq!(config.color_format, ColorFormat::Rgb);
        assert_eq!(config.magnifier_size, 160.0);
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(OverlayConfig::load_from(&path), OverlayConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("overlay.json");
        let config = OverlayConfig {
            mask_opacity: 0.3,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(OverlayConfig::load_from(&path), config);
    }

    #[test]
    fn test_color_to_rgba_u8() {
        assert_eq!(
            OverlayColor::rgba(1.0, 0.0, 0.5, 0.5).to_rgba_u8(),
            [255, 0, 128, 128]
        );
    }
}
