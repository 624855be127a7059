// src/diagnosis/task.rs
use std::fmt;
use std::str::FromStr;

use crate::error::TaskError;

/// Models served by the reference HealthGuard backend.
pub const KNOWN_TASKS: &[&str] = &["diabetes", "anemia", "deficiency"];

pub const DEFAULT_TASK: &str = "diabetes";

/// Name of the remote model to invoke; becomes the last path segment of
/// `/predict/{task}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(task: impl Into<String>) -> Result<Self, TaskError> {
        let task = task.into();
        let trimmed = task.trim();
        if trimmed.is_empty() {
            return Err(TaskError::Empty);
        }
        if matches!(trimmed, "." | "..") {
            return Err(TaskError::DotSegment(trimmed.to_string()));
        }
        if let Some(ch) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '/' | '\\' | '?' | '#' | '%'))
        {
            return Err(TaskError::InvalidCharacter {
                task: trimmed.to_string(),
                ch,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the reference backend ships a model for this task.
    pub fn is_known(&self) -> bool {
        KNOWN_TASKS.contains(&self.0.as_str())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self(DEFAULT_TASK.to_string())
    }
}

impl FromStr for TaskId {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
