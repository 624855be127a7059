// src/diagnosis/result.rs
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SubmitError;

/// Parsed and validated answer of `/predict/{task}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisResult {
    pub diagnosis: String,
    /// Percentage, 0 to 100.
    pub confidence: f64,
    pub task: Option<String>,
    /// Raw model output when the server reports it.
    pub score: Option<f64>,
}

// Wire shape; unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct RawDiagnosis {
    diagnosis: String,
    confidence: f64,
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawServerError {
    error: String,
}

impl DiagnosisResult {
    /// Decode and validate a response body.
    pub fn from_json(body: &str) -> Result<Self, SubmitError> {
        let raw: RawDiagnosis = serde_json::from_str(body)
            .map_err(|e| SubmitError::Decode(format!("expected diagnosis JSON: {e}")))?;

        if raw.diagnosis.trim().is_empty() {
            return Err(SubmitError::Decode("empty diagnosis label".to_string()));
        }
        if !raw.confidence.is_finite() || !(0.0..=100.0).contains(&raw.confidence) {
            return Err(SubmitError::Decode(format!(
                "confidence {} outside 0..=100",
                raw.confidence
            )));
        }

        Ok(Self {
            diagnosis: raw.diagnosis,
            confidence: raw.confidence,
            task: raw.task,
            score: raw.score,
        })
    }

    /// Line shown under the camera view.
    pub fn display_text(&self) -> String {
        format!("Diagnostic : {} ({}%)", self.diagnosis, self.confidence)
    }
}

impl fmt::Display for DiagnosisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

/// Extract `{"error": "..."}` from a failure body, if the server sent one.
pub(crate) fn server_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<RawServerError>(body)
        .ok()
        .map(|e| e.error)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
        })
}
