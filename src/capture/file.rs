// src/capture/file.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use image::{DynamicImage, ImageFormat};
use log::{debug, info};

use super::{Camera, ImageReference};
use crate::error::CaptureError;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

static CAPTURE_SEQ: AtomicU64 = AtomicU64::new(0);

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false)
}

/// Fresh, unique file name inside `dir`.
fn next_capture_path(dir: &Path) -> Result<PathBuf, CaptureError> {
    fs::create_dir_all(dir)?;
    let seq = CAPTURE_SEQ.fetch_add(1, Ordering::Relaxed);
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
    Ok(dir.join(format!("capture-{stamp}-{seq}.jpg")))
}

/// Encode `image` as JPEG into the capture directory.
pub fn write_jpeg(image: &DynamicImage, dir: &Path) -> Result<ImageReference, CaptureError> {
    let path = next_capture_path(dir)?;
    // JPEG has no alpha channel.
    DynamicImage::ImageRgb8(image.to_rgb8()).save_with_format(&path, ImageFormat::Jpeg)?;
    debug!("Wrote {}x{} JPEG to {}", image.width(), image.height(), path.display());
    Ok(ImageReference::new(path))
}

/// Copy an existing picture into the capture directory as JPEG.
///
/// JPEG sources are copied byte for byte, anything else is re-encoded.
pub fn import_image(source: &Path, dir: &Path) -> Result<ImageReference, CaptureError> {
    let metadata = fs::metadata(source).map_err(|e| {
        CaptureError::Device(format!("cannot open {}: {e}", source.display()))
    })?;
    if metadata.len() == 0 {
        return Err(CaptureError::NoImage);
    }

    if is_jpeg(source) {
        let path = next_capture_path(dir)?;
        fs::copy(source, &path)?;
        return Ok(ImageReference::new(path));
    }

    let image = image::open(source)?;
    write_jpeg(&image, dir)
}

/// Most recently modified picture in `dir`.
pub fn newest_image(dir: &Path) -> Result<PathBuf, CaptureError> {
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !is_image_file(&path) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(best, _)| modified > *best) {
            newest = Some((modified, path));
        }
    }
    newest.map(|(_, path)| path).ok_or(CaptureError::NoImage)
}

/// Takes pictures from disk: a fixed file, or the newest image of a folder
/// that a phone or webcam syncs into.
pub struct FileCamera {
    source: PathBuf,
    capture_dir: PathBuf,
}

impl FileCamera {
    pub fn new(source: impl Into<PathBuf>, capture_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            capture_dir: capture_dir.into(),
        }
    }
}

impl Camera for FileCamera {
    fn name(&self) -> &str {
        "file"
    }

    fn take_picture(&mut self) -> Result<ImageReference, CaptureError> {
        let picture = if self.source.is_dir() {
            newest_image(&self.source)?
        } else {
            self.source.clone()
        };
        info!("Taking picture from {}", picture.display());
        import_image(&picture, &self.capture_dir)
    }
}
