// src/capture/screenshot.rs
use std::path::PathBuf;

use image::{DynamicImage, RgbaImage};
use log::{info, warn};
use screenshots::Screen;

use super::file::write_jpeg;
use super::{Camera, ImageReference};
use crate::error::CaptureError;

/// Uses the primary display as the camera.
pub struct ScreenCamera {
    capture_dir: PathBuf,
}

impl ScreenCamera {
    pub fn new(capture_dir: impl Into<PathBuf>) -> Self {
        Self {
            capture_dir: capture_dir.into(),
        }
    }

    fn grab_primary() -> Result<DynamicImage, CaptureError> {
        let screens = Screen::all().map_err(|e| CaptureError::Device(e.to_string()))?;
        let screen = match screens.iter().find(|s| s.display_info.is_primary) {
            Some(screen) => screen,
            None => {
                warn!("Could not identify primary screen. Using the first screen found.");
                screens.first().ok_or(CaptureError::NoImage)?
            }
        };

        let shot = screen
            .capture()
            .map_err(|e| CaptureError::Device(e.to_string()))?;
        let width = shot.width();
        let height = shot.height();
        if width == 0 || height == 0 {
            return Err(CaptureError::NoImage);
        }

        let rgba = RgbaImage::from_raw(width, height, shot.as_raw().to_vec())
            .ok_or_else(|| CaptureError::Device("screen buffer has unexpected size".to_string()))?;
        info!("Screen captured: {}x{}", width, height);
        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

impl Camera for ScreenCamera {
    fn name(&self) -> &str {
        "screen"
    }

    fn take_picture(&mut self) -> Result<ImageReference, CaptureError> {
        let image = Self::grab_primary()?;
        write_jpeg(&image, &self.capture_dir)
    }
}
