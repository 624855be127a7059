// src/capture/picker.rs
use std::path::PathBuf;

use log::info;

use super::file::{import_image, IMAGE_EXTENSIONS};
use super::{Camera, ImageReference};
use crate::error::CaptureError;

/// Lets the user choose a photo with the native file dialog.
pub struct PickerCamera {
    capture_dir: PathBuf,
}

impl PickerCamera {
    pub fn new(capture_dir: impl Into<PathBuf>) -> Self {
        Self {
            capture_dir: capture_dir.into(),
        }
    }
}

impl Camera for PickerCamera {
    fn name(&self) -> &str {
        "photo picker"
    }

    fn take_picture(&mut self) -> Result<ImageReference, CaptureError> {
        let picked = rfd::FileDialog::new()
            .set_title("Choisir une photo")
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
            .ok_or(CaptureError::NoImage)?;
        info!("Picked {}", picked.display());
        import_image(&picked, &self.capture_dir)
    }
}
