// src/diagnosis/client.rs
use std::time::Instant;

use log::{debug, error, info, warn};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;

use super::connector::{DiagnosisConnector, ServerHealth};
use super::result::{server_error_message, DiagnosisResult};
use super::task::TaskId;
use crate::capture::ImageReference;
use crate::config::ClientConfig;
use crate::error::SubmitError;

/// Multipart field the server reads the picture from.
pub const IMAGE_FIELD: &str = "image";
pub const IMAGE_FILENAME: &str = "image.jpg";
pub const IMAGE_MIME: &str = "image/jpeg";

/// HTTP client for a HealthGuard inference server.
pub struct SubmissionClient {
    client: Client,
    config: ClientConfig,
}

impl SubmissionClient {
    pub fn new(config: ClientConfig) -> Result<Self, SubmitError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(SubmitError::Transport)?;

        info!("Submission client ready for {}", config.base_endpoint);
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// One part, always `image` / `image.jpg` / `image/jpeg`, whatever the
    /// bytes are.
    fn image_form(bytes: Vec<u8>) -> Result<Form, SubmitError> {
        let part = Part::bytes(bytes)
            .file_name(IMAGE_FILENAME)
            .mime_str(IMAGE_MIME)
            .map_err(SubmitError::Transport)?;
        Ok(Form::new().part(IMAGE_FIELD, part))
    }
}

impl DiagnosisConnector for SubmissionClient {
    fn submit(&self, task: &TaskId, image: ImageReference) -> Result<DiagnosisResult, SubmitError> {
        let bytes = std::fs::read(image.path()).map_err(|source| SubmitError::Image {
            path: image.path().to_path_buf(),
            source,
        })?;
        let url = self.config.predict_url(task);
        info!("Submitting {} ({} bytes) to {}", image.uri(), bytes.len(), url);

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .multipart(Self::image_form(bytes)?)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    error!("Request to {} timed out after {:?}", url, self.config.timeout);
                } else {
                    error!("Request to {} failed: {}", url, e);
                }
                SubmitError::Transport(e)
            })?;

        let status = response.status();
        let body = response.text().map_err(SubmitError::Transport)?;
        debug!("{} answered {} in {:?}", url, status, started.elapsed());

        if !status.is_success() {
            let message = server_error_message(&body);
            warn!("Server rejected {} with {}: {:?}", task, status, message);
            return Err(SubmitError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let result = DiagnosisResult::from_json(&body)?;
        info!(
            "Task {}: {} ({}%) in {:?}",
            task,
            result.diagnosis,
            result.confidence,
            started.elapsed()
        );
        Ok(result)
    }

    fn health(&self) -> Result<ServerHealth, SubmitError> {
        let url = self.config.health_url();
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(SubmitError::Transport)?;

        let status = response.status();
        let body = response.text().map_err(SubmitError::Transport)?;
        if !status.is_success() {
            return Err(SubmitError::Server {
                status: status.as_u16(),
                message: server_error_message(&body),
            });
        }
        serde_json::from_str(&body)
            .map_err(|e| SubmitError::Decode(format!("expected health JSON: {e}")))
    }
}
