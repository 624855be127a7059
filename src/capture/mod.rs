// src/capture/mod.rs
//! Camera access gated by a permission decision.

pub mod file;
pub mod permission;
pub mod picker;
pub mod screenshot;

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::CaptureError;
pub use permission::{PermissionPrompt, PermissionState};

/// Handle to a captured JPEG on local disk.
///
/// Not `Clone`: a reference is handed to the submission client exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct ImageReference {
    path: PathBuf,
}

impl ImageReference {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn uri(&self) -> String {
        format!("file://{}", self.path.display())
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// A device that can take a picture and store it as JPEG.
pub trait Camera: Send {
    /// Short name shown in permission prompts and logs.
    fn name(&self) -> &str;

    fn take_picture(&mut self) -> Result<ImageReference, CaptureError>;
}

/// Wraps a [`Camera`] and refuses to use it until permission is granted.
pub struct CaptureAdapter {
    camera: Box<dyn Camera>,
    prompt: Box<dyn PermissionPrompt>,
    permission: PermissionState,
}

impl CaptureAdapter {
    pub fn new(camera: Box<dyn Camera>, prompt: Box<dyn PermissionPrompt>) -> Self {
        Self {
            camera,
            prompt,
            permission: PermissionState::Unknown,
        }
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn camera_name(&self) -> &str {
        self.camera.name()
    }

    /// Ask the user while undecided; once granted or denied the answer sticks.
    pub fn request_permission(&mut self) -> PermissionState {
        if self.permission.is_decided() {
            return self.permission;
        }
        self.permission = self.prompt.ask(self.camera.name());
        match self.permission {
            PermissionState::Granted => info!("Camera permission granted for {}", self.camera.name()),
            PermissionState::Denied => warn!("Camera permission denied for {}", self.camera.name()),
            PermissionState::Unknown => warn!("Camera permission prompt dismissed"),
        }
        self.permission
    }

    pub fn capture(&mut self) -> Result<ImageReference, CaptureError> {
        if self.permission != PermissionState::Granted {
            return Err(CaptureError::PermissionDenied);
        }
        info!("Capturing with {}", self.camera.name());
        let image = self.camera.take_picture()?;
        info!("Captured {}", image.path().display());
        Ok(image)
    }
}
