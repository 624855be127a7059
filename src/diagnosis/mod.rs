// src/diagnosis/mod.rs
pub mod client;
pub mod connector;
pub mod result;
pub mod task;

pub use client::SubmissionClient;
pub use connector::{DiagnosisConnector, ServerHealth};
pub use result::DiagnosisResult;
pub use task::TaskId;
