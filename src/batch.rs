//! Parallel batch execution of a descriptor over a set of images.
//!
//! A [`BatchRunner`] owns its own rayon pool sized at construction, so
//! several runners with different worker counts can coexist in one process
//! and nothing touches rayon's global pool.
//!
//! Results always come back in input order, whatever order the workers
//! finish in. [`BatchRunner::run`] stops at the first failure;
//! [`BatchRunner::run_partial`] keeps going and reports every unit.
//!
//! Cancellation is cooperative: the runner's [`CancelToken`] is checked
//! before each unit starts, and `run_partial` also checks a per-call stop
//! token. Units already running are not interrupted.

use crate::descriptors::{Descriptor, DescriptorError};
use ndarray::ArrayD;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("Cannot read matched path: {0}")]
    Glob(#[from] glob::GlobError),
    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("{}: {source}", path.display())]
    Descriptor {
        path: PathBuf,
        #[source]
        source: DescriptorError,
    },
    #[error("Batch cancelled")]
    Cancelled,
}

/// Shared flag that stops a batch before its remaining units start.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One unit that did not produce features.
#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub path: PathBuf,
    pub error: BatchError,
}

/// Outcome of [`BatchRunner::run_partial`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Input index and features of every successful unit, in input order.
    pub successes: Vec<(usize, ArrayD<f64>)>,
    /// Every failed or cancelled unit, in input order.
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Features of the successful units, dropping their indices.
    pub fn into_features(self) -> Vec<ArrayD<f64>> {
        self.successes.into_iter().map(|(_, f)| f).collect()
    }
}

/// Number of cores the process may use.
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Worker count for a requested limit.
///
/// `None` means all cores. Explicit counts are clamped to `1..=cores`:
/// callers can constrain down, not up.
pub fn resolve_threads(requested: Option<usize>) -> usize {
    let cores = available_cores();
    requested.map(|n| n.clamp(1, cores)).unwrap_or(cores)
}

/// Image paths matching `pattern`, in sorted order.
///
/// Only regular files are returned. A pattern matching nothing yields an
/// empty list, not an error.
pub fn enumerate(pattern: &str) -> Result<Vec<PathBuf>, BatchError> {
    let paths = glob::glob(pattern).map_err(|source| BatchError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in paths {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

/// Runs descriptors over image lists on a private worker pool.
pub struct BatchRunner {
    pool: rayon::ThreadPool,
    threads: usize,
    cancel: CancelToken,
}

impl BatchRunner {
    /// Create a runner with `threads` workers (`None` = all cores).
    pub fn new(threads: Option<usize>) -> Result<Self, BatchError> {
        let threads = resolve_threads(threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("texture-worker-{i}"))
            .build()?;
        Ok(Self {
            pool,
            threads,
            cancel: CancelToken::new(),
        })
    }

    /// Replace the runner's cancel token with a shared one.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    fn unit<D: Descriptor + ?Sized>(
        &self,
        descriptor: &D,
        path: &Path,
        stop: Option<&CancelToken>,
    ) -> Result<ArrayD<f64>, BatchError> {
        if self.cancel.is_cancelled() || stop.is_some_and(CancelToken::is_cancelled) {
            return Err(BatchError::Cancelled);
        }
        descriptor.extract(path).map_err(|source| BatchError::Descriptor {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Extract features for every path, in input order.
    ///
    /// `on_done` is called from the worker thread after each unit succeeds,
    /// with the unit's input index. The first failure aborts the batch and
    /// no features are returned.
    pub fn run<D, F>(&self, paths: &[PathBuf], descriptor: &D, on_done: F) -> Result<Vec<ArrayD<f64>>, BatchError>
    where
        D: Descriptor + ?Sized,
        F: Fn(usize, &Path) + Sync,
    {
        self.pool.install(|| {
            paths
                .par_iter()
                .enumerate()
                .map(|(index, path)| -> Result<ArrayD<f64>, BatchError> {
                    let features = self.unit(descriptor, path, None)?;
                    on_done(index, path);
                    Ok(features)
                })
                .collect()
        })
    }

    /// Like [`run`](Self::run), but every unit runs and failures are
    /// collected instead of aborting the batch.
    ///
    /// `on_unit` sees each unit's input index and its error, if any.
    /// Cancelling `stop` (from `on_unit` or elsewhere) turns the units that
    /// have not started yet into [`BatchError::Cancelled`] failures.
    pub fn run_partial<D, F>(&self, paths: &[PathBuf], descriptor: &D, stop: &CancelToken, on_unit: F) -> BatchReport
    where
        D: Descriptor + ?Sized,
        F: Fn(usize, &Path, Option<&BatchError>) + Sync,
    {
        let outcomes: Vec<Result<ArrayD<f64>, BatchError>> = self.pool.install(|| {
            paths
                .par_iter()
                .enumerate()
                .map(|(index, path)| {
                    let outcome = self.unit(descriptor, path, Some(stop));
                    on_unit(index, path, outcome.as_ref().err());
                    outcome
                })
                .collect()
        });

        let mut report = BatchReport::default();
        for (index, (outcome, path)) in outcomes.into_iter().zip(paths).enumerate() {
            match outcome {
                Ok(features) => report.successes.push((index, features)),
                Err(error) => report.failures.push(BatchFailure {
                    index,
                    path: path.clone(),
                    error,
                }),
            }
        }
        report
    }
}
