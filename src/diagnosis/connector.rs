// src/diagnosis/connector.rs
use serde::Deserialize;

use super::result::DiagnosisResult;
use super::task::TaskId;
use crate::capture::ImageReference;
use crate::error::SubmitError;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerHealth {
    pub status: String,
}

impl ServerHealth {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Trait defining the interface to a remote diagnosis service
pub trait DiagnosisConnector: Send + Sync {
    /// Upload one image for `task` and return the parsed diagnosis.
    fn submit(&self, task: &TaskId, image: ImageReference) -> Result<DiagnosisResult, SubmitError>;

    fn health(&self) -> Result<ServerHealth, SubmitError>;
}

impl<T: DiagnosisConnector + ?Sized> DiagnosisConnector for std::sync::Arc<T> {
    fn submit(&self, task: &TaskId, image: ImageReference) -> Result<DiagnosisResult, SubmitError> {
        (**self).submit(task, image)
    }

    fn health(&self) -> Result<ServerHealth, SubmitError> {
        (**self).health()
    }
}
