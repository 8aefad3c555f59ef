//! File-backed host: crops committed regions out of the full capture and saves them

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use futures::FutureExt;
use image::RgbaImage;

use crate::core::host::{HostFuture, HostPort};
use crate::domain::CaptureRegion;

/// Cut a committed region out of the full-resolution capture
///
/// The region is clamped to the image; `None` if nothing is left.
pub fn crop_region(img: &RgbaImage, region: CaptureRegion) -> Option<RgbaImage> {
    let x = region.x.max(0.0) as u32;
    let y = region.y.max(0.0) as u32;
    if x >= img.width() || y >= img.height() {
        return None;
    }
    let width = (region.width.max(0.0) as u32).min(img.width() - x);
    let height = (region.height.max(0.0) as u32).min(img.height() - y);
    if width == 0 || height == 0 {
        return None;
    }
    Some(image::imageops::crop_imm(img, x, y, width, height).to_image())
}

pub fn save_rgba(img: &RgbaImage, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    Ok(write_png(&mut file, img)?)
}

pub fn write_png<W: io::Write>(w: W, image: &RgbaImage) -> Result<(), png::EncodingError> {
    let mut encoder = png::Encoder::new(w, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())
}

/// Default folder for saved regions
pub fn default_output_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
        .unwrap_or_else(std::env::temp_dir)
}

pub fn get_img_path(dir: &Path) -> PathBuf {
    let name = chrono::Local::now()
        .format("Screenshot_%Y-%m-%d_%H-%M-%S%.3f.png")
        .to_string();
    dir.join(name)
}

/// Host that owns the capture lock and writes each committed region to disk
pub struct FileHost {
    image: Arc<RgbaImage>,
    out_dir: PathBuf,
    capturing: Arc<AtomicBool>,
    saved: Arc<Mutex<Option<PathBuf>>>,
    close_reason: Mutex<Option<String>>,
}

impl FileHost {
    /// Take the capture lock for a new session over `image`
    pub fn new(image: RgbaImage, out_dir: PathBuf) -> Self {
        Self {
            image: Arc::new(image),
            out_dir,
            capturing: Arc::new(AtomicBool::new(true)),
            saved: Arc::new(Mutex::new(None)),
            close_reason: Mutex::new(None),
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    pub fn last_saved(&self) -> Option<PathBuf> {
        self.saved.lock().ok().and_then(|saved| saved.clone())
    }

    pub fn close_reason(&self) -> Option<String> {
        self.close_reason.lock().ok().and_then(|reason| reason.clone())
    }
}

impl HostPort for FileHost {
    fn commit(&self, region: CaptureRegion) -> HostFuture {
        let image = self.image.clone();
        let out_dir = self.out_dir.clone();
        let capturing = self.capturing.clone();
        let saved = self.saved.clone();
        async move {
            log::info!(
                "Processing region: x={}, y={}, w={}, h={}",
                region.x,
                region.y,
                region.width,
                region.height
            );
            let path = tokio::task::spawn_blocking(move || -> anyhow::Result<PathBuf> {
                let cropped = crop_region(&image, region)
                    .context("selected region lies outside the capture")?;
                std::fs::create_dir_all(&out_dir)
                    .with_context(|| format!("failed to create {}", out_dir.display()))?;
                let path = get_img_path(&out_dir);
                save_rgba(&cropped, &path)?;
                Ok(path)
            })
            .await??;

            log::info!("Region saved to {}", path.display());
            if let Ok(mut slot) = saved.lock() {
                *slot = Some(path);
            }
            capturing.store(false, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(())
        }
        .boxed()
    }

    fn cancel(&self) -> HostFuture {
        let capturing = self.capturing.clone();
        async move {
            log::info!("Capture cancelled, releasing lock");
            capturing.store(false, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }

    fn copy_color(&self, text: String) -> HostFuture {
        async move {
            // No clipboard here; the color goes to stdout for the caller to pick up
            println!("{}", text);
            Ok(())
        }
        .boxed()
    }

    fn request_close(&self, diagnostic: &str) {
        eprintln!("{}", diagnostic);
        if let Ok(mut reason) = self.close_reason.lock() {
            *reason = Some(diagnostic.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient() -> RgbaImage {
        RgbaImage::from_fn(40, 30, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn test_crop_region_clamps() {
        let img = gradient();
        let region = CaptureRegion {
            x: 30.0,
            y: 20.0,
            width: 50.0,
            height: 50.0,
        };
        let cropped = crop_region(&img, region).unwrap();
        assert_eq!(cropped.dimensions(), (10, 10));
        assert_eq!(cropped.get_pixel(0, 0), &Rgba([30, 20, 0, 255]));
    }

    #[test]
    fn test_crop_region_outside_is_none() {
        let img = gradient();
        let region = CaptureRegion {
            x: 40.0,
            y: 0.0,
            width: 5.0,
            height: 5.0,
        };
        assert!(crop_region(&img, region).is_none());
    }

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        save_rgba(&gradient(), &path).unwrap();
        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back, gradient());
    }

    #[tokio::test]
    async fn test_commit_saves_and_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let host = FileHost::new(gradient(), dir.path().to_path_buf());
        assert!(host.is_capturing());

        let region = CaptureRegion {
            x: 5.0,
            y: 6.0,
            width: 10.0,
            height: 4.0,
        };
        host.commit(region).await.unwrap();

        assert!(!host.is_capturing());
        let saved = host.last_saved().unwrap();
        let img = image::open(saved).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (10, 4));
        assert_eq!(img.get_pixel(0, 0), &Rgba([5, 6, 0, 255]));
    }

    #[tokio::test]
    async fn test_commit_outside_fails() {
        let dir = tempfile::tempdir().unwrap();
        let host = FileHost::new(gradient(), dir.path().to_path_buf());
        let region = CaptureRegion {
            x: 100.0,
            y: 100.0,
            width: 10.0,
            height: 10.0,
        };
        assert!(host.commit(region).await.is_err());
        assert!(host.is_capturing());
        host.cancel().await.unwrap();
        assert!(!host.is_capturing());
    }
}
