//! Extraction pipeline for one descriptor kind.
//!
//! ```text
//! glob ──► enumerate ──► labels file
//!              │
//!              └──► batch (parallel) ──► features file
//! ```
//!
//! Every run writes the label file before the features, so each kind can
//! run on its own. Labels depend only on the glob, the prefix and the
//! extension; running several kinds against the same label path rewrites
//! identical bytes.
//!
//! With `keep_going` set, images that fail are skipped instead of aborting
//! the run. Labels are then written after the batch, for the surviving
//! images only, so label line `i` and feature row `i` still describe the
//! same image.
//!
//! Progress is reported through an optional channel of [`PipelineEvent`]s,
//! rendered by [`crate::output`].

use crate::batch::{self, BatchError, BatchReport, BatchRunner, CancelToken};
use crate::descriptors::{Descriptor, DescriptorError, DescriptorKind, DescriptorParams};
use crate::flat::{DEFAULT_DELIMITER, FileFormat, FlatWriter, FormatError};
use crate::labels::{self, DEFAULT_EXTENSION};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
    #[error("Format error: {0}")]
    Format(#[from] FormatError),
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("{kind}: {failed} images failed, more than the limit of {limit}")]
    TooManyFailures {
        kind: DescriptorKind,
        failed: usize,
        limit: usize,
    },
}

/// Everything one extraction run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Glob selecting the input images, e.g. `BaseDeDados/*.bmp`.
    pub image_glob: String,
    pub label_path: PathBuf,
    pub output_path: PathBuf,
    pub descriptor: DescriptorParams,
    pub delimiter: String,
    /// Extension removed from filenames when deriving labels.
    pub extension: String,
    pub format: FileFormat,
    /// Skip failing images instead of aborting.
    pub keep_going: bool,
    /// With `keep_going`, abort once more images than this have failed.
    pub max_failures: Option<usize>,
}

impl PipelineConfig {
    /// A config with the default delimiter, extension and file format.
    pub fn new(
        image_glob: impl Into<String>,
        label_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        descriptor: DescriptorParams,
    ) -> Self {
        Self {
            image_glob: image_glob.into(),
            label_path: label_path.into(),
            output_path: output_path.into(),
            descriptor,
            delimiter: DEFAULT_DELIMITER.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            format: FileFormat::default(),
            keep_going: false,
            max_failures: None,
        }
    }

    pub fn writer(&self) -> FlatWriter {
        FlatWriter::new(self.format, self.delimiter.clone())
    }
}

/// Progress notifications emitted while a pipeline runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Started {
        kind: DescriptorKind,
        pattern: String,
    },
    Enumerated {
        kind: DescriptorKind,
        count: usize,
    },
    LabelsWritten {
        path: PathBuf,
        count: usize,
    },
    /// One image finished. Arrives in completion order, not input order.
    ImageExtracted {
        kind: DescriptorKind,
        index: usize,
        total: usize,
        path: PathBuf,
    },
    /// One image failed and was skipped (`keep_going` runs only).
    ImageSkipped {
        kind: DescriptorKind,
        index: usize,
        total: usize,
        path: PathBuf,
        error: String,
    },
    FeaturesWritten {
        kind: DescriptorKind,
        path: PathBuf,
        rows: usize,
    },
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub kind: DescriptorKind,
    /// Images that produced a row, in row order.
    pub images: Vec<PathBuf>,
    /// Images left out by a `keep_going` run.
    pub skipped: Vec<PathBuf>,
    pub labels: Vec<String>,
    pub label_path: PathBuf,
    pub output_path: PathBuf,
}

fn emit(events: &Option<Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening.
        let _ = tx.send(event);
    }
}

fn ensure_parent(path: &Path) -> Result<(), std::io::Error> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Derive labels for `paths` and write them to `label_path`.
pub fn write_labels(
    paths: &[PathBuf],
    image_glob: &str,
    extension: &str,
    label_path: &Path,
    writer: &FlatWriter,
) -> Result<Vec<String>, PipelineError> {
    let labels = labels::derive_labels(paths, labels::glob_prefix(image_glob), extension);
    ensure_parent(label_path)?;
    writer.write_strings(label_path, &labels)?;
    Ok(labels)
}

/// Enumerate `image_glob` and write only the label file.
pub fn write_labels_for_glob(
    image_glob: &str,
    extension: &str,
    label_path: &Path,
    writer: &FlatWriter,
) -> Result<Vec<String>, PipelineError> {
    let paths = batch::enumerate(image_glob)?;
    write_labels(&paths, image_glob, extension, label_path, writer)
}

/// Run one extraction with the descriptor configured in `config`.
///
/// Parameters are validated before any file is touched.
pub fn run_pipeline(
    config: &PipelineConfig,
    runner: &BatchRunner,
    events: Option<Sender<PipelineEvent>>,
) -> Result<PipelineReport, PipelineError> {
    config.descriptor.validate()?;
    run_pipeline_with(config, &config.descriptor, runner, events)
}

/// Run one extraction with an arbitrary descriptor (allows testing with mock).
///
/// `config.descriptor` is ignored; `descriptor` does the work.
pub fn run_pipeline_with<D: Descriptor + ?Sized>(
    config: &PipelineConfig,
    descriptor: &D,
    runner: &BatchRunner,
    events: Option<Sender<PipelineEvent>>,
) -> Result<PipelineReport, PipelineError> {
    let kind = descriptor.kind();
    let writer = config.writer();
    emit(
        &events,
        PipelineEvent::Started {
            kind,
            pattern: config.image_glob.clone(),
        },
    );

    let paths = batch::enumerate(&config.image_glob)?;
    let total = paths.len();
    emit(&events, PipelineEvent::Enumerated { kind, count: total });

    if config.keep_going {
        return run_skipping_failures(config, descriptor, runner, &events, paths);
    }

    let labels = write_labels(
        &paths,
        &config.image_glob,
        &config.extension,
        &config.label_path,
        &writer,
    )?;
    emit(
        &events,
        PipelineEvent::LabelsWritten {
            path: config.label_path.clone(),
            count: labels.len(),
        },
    );

    let features = runner.run(&paths, descriptor, |index, path| {
        emit(
            &events,
            PipelineEvent::ImageExtracted {
                kind,
                index,
                total,
                path: path.to_path_buf(),
            },
        );
    })?;

    ensure_parent(&config.output_path)?;
    let rows = writer.write_arrays(&config.output_path, &features)?;
    emit(
        &events,
        PipelineEvent::FeaturesWritten {
            kind,
            path: config.output_path.clone(),
            rows,
        },
    );

    Ok(PipelineReport {
        kind,
        images: paths,
        skipped: Vec::new(),
        labels,
        label_path: config.label_path.clone(),
        output_path: config.output_path.clone(),
    })
}

/// The `keep_going` variant: extract first, then write labels and features
/// for the images that succeeded.
fn run_skipping_failures<D: Descriptor + ?Sized>(
    config: &PipelineConfig,
    descriptor: &D,
    runner: &BatchRunner,
    events: &Option<Sender<PipelineEvent>>,
    paths: Vec<PathBuf>,
) -> Result<PipelineReport, PipelineError> {
    let kind = descriptor.kind();
    let total = paths.len();
    let failed = AtomicUsize::new(0);
    let stop = CancelToken::new();

    let report: BatchReport = runner.run_partial(&paths, descriptor, &stop, |index, path, error| {
        let path = path.to_path_buf();
        match error {
            None => emit(events, PipelineEvent::ImageExtracted { kind, index, total, path }),
            Some(BatchError::Cancelled) => {}
            Some(error) => {
                emit(
                    events,
                    PipelineEvent::ImageSkipped {
                        kind,
                        index,
                        total,
                        path,
                        error: error.to_string(),
                    },
                );
                let count = failed.fetch_add(1, Ordering::SeqCst) + 1;
                if config.max_failures.is_some_and(|limit| count > limit) {
                    stop.cancel();
                }
            }
        }
    });

    if let Some(limit) = config.max_failures.filter(|_| stop.is_cancelled()) {
        return Err(PipelineError::TooManyFailures {
            kind,
            failed: failed.load(Ordering::SeqCst),
            limit,
        });
    }
    if report.failures.iter().any(|f| matches!(f.error, BatchError::Cancelled)) {
        return Err(BatchError::Cancelled.into());
    }

    let all_labels = labels::derive_labels(&paths, labels::glob_prefix(&config.image_glob), &config.extension);
    let mut images = Vec::with_capacity(report.successes.len());
    let mut kept_labels = Vec::with_capacity(report.successes.len());
    let mut features = Vec::with_capacity(report.successes.len());
    for (index, row) in report.successes {
        images.push(paths[index].clone());
        kept_labels.push(all_labels[index].clone());
        features.push(row);
    }
    let skipped = report.failures.into_iter().map(|f| f.path).collect();

    let writer = config.writer();
    ensure_parent(&config.label_path)?;
    writer.write_strings(&config.label_path, &kept_labels)?;
    emit(
        events,
        PipelineEvent::LabelsWritten {
            path: config.label_path.clone(),
            count: kept_labels.len(),
        },
    );

    ensure_parent(&config.output_path)?;
    let rows = writer.write_arrays(&config.output_path, &features)?;
    emit(
        events,
        PipelineEvent::FeaturesWritten {
            kind,
            path: config.output_path.clone(),
            rows,
        },
    );

    Ok(PipelineReport {
        kind,
        images,
        skipped,
        labels: kept_labels,
        label_path: config.label_path.clone(),
        output_path: config.output_path.clone(),
    })
}
