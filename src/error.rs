// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the capture adapter.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera permission not granted")]
    PermissionDenied,

    #[error("camera failure: {0}")]
    Device(String),

    #[error("camera returned no image")]
    NoImage,

    #[error("failed to write capture: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode capture as JPEG: {0}")]
    Encode(#[from] image::ImageError),
}

/// Failures of a single submission round-trip.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("cannot read image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("server returned HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Server { status: u16, message: Option<String> },

    #[error("invalid response: {0}")]
    Decode(String),
}

impl SubmitError {
    /// HTTP status for `Server` errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SubmitError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "no server endpoint configured (use --endpoint, HEALTHGUARD_API_URL or `base_endpoint` in the config file)"
    )]
    MissingEndpoint,

    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Task(#[from] TaskError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task identifier is empty")]
    Empty,

    #[error("task identifier '{task}' contains invalid character {ch:?}")]
    InvalidCharacter { task: String, ch: char },

    #[error("task identifier '{0}' is a relative path segment")]
    DotSegment(String),
}

/// Outcome of a rejected or failed capture/submission cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("an analysis is already in progress")]
    Busy,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

impl CycleError {
    /// Message shown to the user in place of a diagnosis.
    pub fn user_message(&self) -> String {
        match self {
            CycleError::Busy => "Analyse déjà en cours, patientez...".to_string(),
            CycleError::Capture(CaptureError::PermissionDenied) => {
                "Permission caméra requise".to_string()
            }
            CycleError::Capture(e) => format!("Capture impossible: {e}"),
            CycleError::Submit(SubmitError::Transport(e)) if e.is_timeout() => {
                "Le serveur ne répond pas (timeout). Réessayez.".to_string()
            }
            CycleError::Submit(SubmitError::Transport(e)) => {
                format!("Serveur injoignable: {e}\n\nIs the HealthGuard server running?")
            }
            CycleError::Submit(e @ SubmitError::Server { .. }) => format!("Erreur serveur: {e}"),
            CycleError::Submit(e) => format!("Analyse impossible: {e}"),
        }
    }
}
