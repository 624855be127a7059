// src/batch.rs
//! Submit every picture of a folder and tally the diagnoses.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::capture::file::{import_image, is_image_file};
use crate::diagnosis::{DiagnosisConnector, DiagnosisResult, TaskId};
use crate::error::CycleError;

pub struct BatchEntry {
    pub file: PathBuf,
    pub outcome: Result<DiagnosisResult, CycleError>,
}

#[derive(Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_err()).count()
    }

    /// Number of images per diagnosis label.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for result in self.entries.iter().filter_map(|e| e.outcome.as_ref().ok()) {
            *counts.entry(result.diagnosis.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn mean_confidence(&self) -> Option<f64> {
        let confidences: Vec<f64> = self
            .entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().ok())
            .map(|r| r.confidence)
            .collect();
        (!confidences.is_empty())
            .then(|| confidences.iter().sum::<f64>() / confidences.len() as f64)
    }
}

/// Pictures directly inside `dir`, sorted by name.
pub fn collect_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// One request per picture; a failing picture does not stop the batch.
pub fn run_batch(
    connector: &dyn DiagnosisConnector,
    task: &TaskId,
    dir: &Path,
    scratch_dir: &Path,
) -> std::io::Result<BatchReport> {
    let files = collect_images(dir)?;
    info!("Analysing {} image(s) from {} with task {}", files.len(), dir.display(), task);

    let mut report = BatchReport::default();
    for file in files {
        let outcome = import_image(&file, scratch_dir)
            .map_err(CycleError::from)
            .and_then(|image| {
                let copy = image.path().to_path_buf();
                let result = connector.submit(task, image).map_err(CycleError::from);
                let _ = std::fs::remove_file(copy);
                result
            });
        if let Err(e) = &outcome {
            warn!("{}: {}", file.display(), e);
        }
        report.entries.push(BatchEntry { file, outcome });
    }
    Ok(report)
}
