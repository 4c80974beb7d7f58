//! Batch cropping of a whole directory.
//!
//! Walks the input directory for supported images, runs one shared
//! [`CropRequest`] against each of them in parallel, and writes the results
//! under the output directory, mirroring subdirectories:
//!
//! ```text
//! input/                      output/
//! ├── alice.jpg          →    ├── alice.png
//! └── team/                   └── team/
//!     └── bob.webp       →        └── bob.png
//! ```
//!
//! Each file is an independent pipeline run with its own buffers. A file that
//! fails is recorded in the [`BatchReport`] and never stops the others.
//!
//! Sources that differ only by extension (`a.jpg`, `a.png`) map to the same
//! output. The first in sorted order is cropped; the rest fail without
//! touching the output.
//!
//! ## Parallel Processing
//!
//! Files are processed with [rayon](https://docs.rs/rayon); the global pool
//! size comes from `processing.max_processes` (see
//! [`config::effective_threads`](crate::config::effective_threads)).

use crate::imaging::{CropRequest, codec};
use crate::pipeline::{self, ErrorCode};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Input is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Result for one source file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Written {
        source: PathBuf,
        output: PathBuf,
        bytes: usize,
    },
    Failed {
        source: PathBuf,
        code: ErrorCode,
        message: String,
    },
}

impl FileOutcome {
    pub fn source(&self) -> &Path {
        match self {
            Self::Written { source, .. } | Self::Failed { source, .. } => source,
        }
    }
}

/// Progress events for the batch printer.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started { total: usize },
    FileDone(FileOutcome),
}

/// Per-file outcomes, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Written { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.written()
    }
}

/// All supported images under `input_dir`, sorted for stable output.
pub fn collect_sources(input_dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !input_dir.is_dir() {
        return Err(BatchError::NotADirectory(input_dir.to_path_buf()));
    }
    let mut sources = Vec::new();
    for entry in WalkDir::new(input_dir).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && codec::is_supported_path(entry.path()) {
            sources.push(entry.into_path());
        }
    }
    sources.sort();
    Ok(sources)
}

/// Where the output for `source` goes: same relative directory, same stem,
/// extension from the output format.
pub fn output_path(input_dir: &Path, output_dir: &Path, source: &Path, extension: &str) -> PathBuf {
    let relative = source.strip_prefix(input_dir).unwrap_or(source);
    let mut name = relative
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(extension);
    output_dir
        .join(relative.parent().unwrap_or(Path::new("")))
        .join(name)
}

/// Output path for each source, in source order. A source whose output an
/// earlier source already claims gets its failure outcome instead.
fn plan_outputs(
    input_dir: &Path,
    output_dir: &Path,
    sources: &[PathBuf],
    extension: &str,
) -> Vec<Result<PathBuf, FileOutcome>> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    sources
        .iter()
        .map(|source| {
            let output = output_path(input_dir, output_dir, source, extension);
            if let Some(first) = claimed.get(&output) {
                let message = format!(
                    "{} would overwrite the output of {}",
                    output.display(),
                    first.display()
                );
                log::warn!("{} skipped: {}", source.display(), message);
                return Err(FileOutcome::Failed {
                    source: source.clone(),
                    code: ErrorCode::CropFailed,
                    message,
                });
            }
            claimed.insert(output.clone(), source);
            Ok(output)
        })
        .collect()
}

fn crop_one(source: &Path, output: PathBuf, request: &CropRequest) -> FileOutcome {
    let failed = |code: ErrorCode, message: String| {
        log::warn!("{} failed [{}]: {}", source.display(), code, message);
        FileOutcome::Failed {
            source: source.to_path_buf(),
            code,
            message,
        }
    };

    let encoded = match pipeline::run(source, request) {
        Ok(encoded) => encoded,
        Err(err) => return failed(err.code(), err.to_string()),
    };
    if let Err(e) = write_output(&output, &encoded.bytes) {
        return failed(
            ErrorCode::CropFailed,
            format!("Cannot write {}: {}", output.display(), e),
        );
    }

    FileOutcome::Written {
        source: source.to_path_buf(),
        output,
        bytes: encoded.bytes.len(),
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

/// Crop every supported image under `input_dir` into `output_dir`.
pub fn run_batch(
    input_dir: &Path,
    output_dir: &Path,
    request: &CropRequest,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchReport, BatchError> {
    let sources = collect_sources(input_dir)?;
    std::fs::create_dir_all(output_dir)?;
    log::info!(
        "batch: {} images from {} → {}",
        sources.len(),
        input_dir.display(),
        output_dir.display()
    );
    if let Some(tx) = &events {
        tx.send(BatchEvent::Started {
            total: sources.len(),
        })
        .ok();
    }

    let planned = plan_outputs(input_dir, output_dir, &sources, request.format.extension());
    let outcomes: Vec<FileOutcome> = sources
        .par_iter()
        .zip(planned.into_par_iter())
        .map(|(source, planned)| {
            let outcome = match planned {
                Ok(output) => crop_one(source, output, request),
                Err(collision) => collision,
            };
            if let Some(tx) = &events {
                tx.send(BatchEvent::FileDone(outcome.clone())).ok();
            }
            outcome
        })
        .collect();

    Ok(BatchReport { outcomes })
}
