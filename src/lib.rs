// src/lib.rs
//! Capture a photo, upload it to a HealthGuard inference server and read
//! back the diagnosis.

pub mod batch;
pub mod capture;
pub mod config;
pub mod diagnosis;
pub mod error;
pub mod session;

pub use capture::{Camera, CaptureAdapter, ImageReference, PermissionState};
pub use config::{ClientConfig, ConfigOverrides};
pub use diagnosis::{DiagnosisConnector, DiagnosisResult, SubmissionClient, TaskId};
pub use error::{CaptureError, ConfigError, CycleError, SubmitError};
pub use session::{Session, SessionState};
