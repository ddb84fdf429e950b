//! Failure manifest: one row per failed task, written as CSV or JSON.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;
use thiserror::Error;

use crate::report::{FetchResult, RunSummary};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Unsupported manifest format {0:?}, use .csv or .json")]
    UnsupportedFormat(PathBuf),
    #[error("Failed to write manifest: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to write manifest: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to write manifest: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    #[serde(rename = "Row")]
    pub row: Option<usize>,
    #[serde(rename = "Sheet")]
    pub group: Option<String>,
    #[serde(rename = "Key")]
    pub identifier: Option<String>,
    #[serde(rename = "File name")]
    pub display_name: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Reason")]
    pub reason: String,
}

impl From<&FetchResult> for FailureRecord {
    fn from(result: &FetchResult) -> Self {
        let task = result.task();

        Self {
            row: task.origin().map(|x| x.row),
            group: task.origin().map(|x| x.group.clone()),
            identifier: task.classification_key().map(ToString::to_string),
            display_name: task.display_name().to_string(),
            url: task.url().to_string(),
            reason: result.reason().unwrap_or_default().to_string(),
        }
    }
}

#[must_use]
pub fn failure_records(summary: &RunSummary) -> Vec<FailureRecord> {
    summary.failed_tasks.iter().map(FailureRecord::from).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Csv,
    Json,
}

impl ManifestFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Write the failed tasks of `summary` to `path`. Returns the number of rows.
pub fn write_failure_manifest(path: &Path, summary: &RunSummary) -> Result<usize, ManifestError> {
    let format = ManifestFormat::from_path(path)
        .ok_or_else(|| ManifestError::UnsupportedFormat(path.to_path_buf()))?;
    let records = failure_records(summary);

    let file = BufWriter::new(File::create(path)?);
    match format {
        ManifestFormat::Csv => write_csv(file, &records)?,
        ManifestFormat::Json => write_json(file, &records)?,
    }

    Ok(records.len())
}

pub fn write_csv<W: Write>(writer: W, records: &[FailureRecord]) -> Result<(), ManifestError> {
    let mut writer = csv::Writer::from_writer(writer);

    if records.is_empty() {
        writer.write_record(["Row", "Sheet", "Key", "File name", "URL", "Reason"])?;
    }

    for record in records {
        writer.serialize(record)?;
    }

    writer.flush()?;

    Ok(())
}

pub fn write_json<W: Write>(mut writer: W, records: &[FailureRecord]) -> Result<(), ManifestError> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;

    Ok(())
}
