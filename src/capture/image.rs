//! Source bitmap and its isolated sampling copy

use anyhow::Context;
use base64::{Engine as _, engine::general_purpose};
use image::RgbaImage;
use tiny_skia::{ColorU8, IntSize, Pixmap};

/// The captured screen at native resolution
///
/// Keeps a premultiplied pixmap for drawing. The pixmap is never drawn into.
#[derive(Clone, Debug)]
pub struct SourceImage {
    pixmap: Pixmap,
}

impl SourceImage {
    /// Decode a `data:image/...;base64,` URL (or bare base64) into a source image
    pub fn from_data_url(data_url: &str) -> anyhow::Result<(Self, SamplingBuffer)> {
        let bytes = decode_data_url(data_url)?;
        let rgba = image::load_from_memory(&bytes)
            .context("failed to decode screenshot image")?
            .to_rgba8();
        Self::from_rgba(rgba)
    }

    /// Build the source image and its sampling copy from decoded pixels
    pub fn from_rgba(rgba: RgbaImage) -> anyhow::Result<(Self, SamplingBuffer)> {
        let (w, h) = (rgba.width(), rgba.height());
        let size = IntSize::from_wh(w, h)
            .with_context(|| format!("screenshot has invalid dimensions {}x{}", w, h))?;

        let mut data = Vec::with_capacity(rgba.as_raw().len());
        for px in rgba.pixels() {
            let c = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        let pixmap =
            Pixmap::from_vec(data, size).context("failed to allocate screenshot pixmap")?;

        log::debug!("SourceImage loaded: {}x{} pixels", w, h);
        let sampling = SamplingBuffer { rgba };
        Ok((Self { pixmap }, sampling))
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

/// Uncomposited copy of the source pixels, only ever read
#[derive(Clone, Debug)]
pub struct SamplingBuffer {
    rgba: RgbaImage,
}

impl SamplingBuffer {
    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    /// Read a single pixel, `None` outside the bitmap
    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        if x < 0 || y < 0 {
            return None;
        }
        self.rgba.get_pixel_checked(x as u32, y as u32).map(|p| p.0)
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.rgba
    }
}

fn decode_data_url(data: &str) -> anyhow::Result<Vec<u8>> {
    let normalized = data.trim();
    if normalized.is_empty() {
        anyhow::bail!("image data URL is empty");
    }

    let payload = if normalized.starts_with("data:") {
        let start = normalized
            .find(";base64,")
            .context("image data URL is missing the base64 marker")?;
        &normalized[start + ";base64,".len()..]
    } else {
        normalized
    };

    general_purpose::STANDARD
        .decode(payload)
        .context("image data URL is not valid base64")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Cursor;

    fn png_data_url(img: &RgbaImage) -> String {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(&bytes)
        )
    }

    #[test]
    fn test_decode_data_url_round_trip_dimensions() {
        let img = RgbaImage::from_pixel(6, 4, Rgba([10, 20, 30, 255]));
        let (source, sampling) = SourceImage::from_data_url(&png_data_url(&img)).unwrap();
        assert_eq!((source.width(), source.height()), (6, 4));
        assert_eq!(sampling.as_rgba(), &img);
    }

    #[test]
    fn test_bare_base64_is_accepted() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        let url = png_data_url(&img);
        let bare = url.split_once(',').unwrap().1;
        assert!(SourceImage::from_data_url(bare).is_ok());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(SourceImage::from_data_url("").is_err());
        assert!(SourceImage::from_data_url("data:image/png,xyz").is_err());
        assert!(SourceImage::from_data_url("data:image/png;base64,!!!").is_err());
        // valid base64, not an image
        assert!(SourceImage::from_data_url("data:image/png;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn test_sampling_buffer_keeps_straight_alpha() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 128]));
        let (source, sampling) = SourceImage::from_rgba(img).unwrap();
        assert_eq!(sampling.pixel(0, 0), Some([200, 100, 50, 128]));
        // the drawing copy is premultiplied
        let drawn = source.pixmap().pixel(0, 0).unwrap();
        assert_eq!(drawn.alpha(), 128);
        assert!(drawn.red() < 200);
    }

    #[test]
    fn test_pixel_out_of_bounds() {
        let img = RgbaImage::new(3, 3);
        let (_, sampling) = SourceImage::from_rgba(img).unwrap();
        assert_eq!(sampling.pixel(-1, 0), None);
        assert_eq!(sampling.pixel(3, 0), None);
        assert_eq!(sampling.pixel(0, 3), None);
        assert!(sampling.pixel(2, 2).is_some());
    }
}
