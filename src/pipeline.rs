//! Job orchestration: one input file in, one watermarked JPEG out.
//!
//! ## Job lifecycle
//!
//! ```text
//! Received ──► Staged (optional) ──► Composited ──► Reported
//!     │                                   ▲
//!     └──────────► Failed ────────────────┘
//! ```
//!
//! 1. Measure the source and register it with the recent-documents list.
//! 2. Reject anything that is not `.jpg`/`.jpeg` before touching the disk.
//! 3. Plan the output path (creates the destination directory).
//! 4. Take the per-destination lock.
//! 5. If the output would overwrite the source, copy it to `{output}.tmp`
//!    and read from the copy.
//! 6. Resize, tile, encode, write; measure the result.
//! 7. Emit a [`JobEvent`] and return the [`JobResult`].
//!
//! The staged copy lives in a guard whose `Drop` deletes it, so it is gone
//! on every exit path, including errors.
//!
//! ## Concurrency
//!
//! [`process_all`] runs jobs on the rayon pool. Jobs for different outputs
//! share nothing mutable. Jobs for the same output (the same photo passed
//! twice) are serialized through [`DestinationLocks`] so they never interleave
//! writes to the output or the staged copy.

use crate::imaging::{BackendError, ImageBackend, WatermarkConfig, watermark_image};
use crate::planner::{self, OutputOptions};
use crate::probe;
use crate::recent::RecentDocuments;
use rayon::prelude::*;
use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Input extensions accepted, compared case-insensitively.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Extension appended to the output path for the staged source copy.
pub const STAGING_EXTENSION: &str = "tmp";

#[derive(Error, Debug)]
pub enum JobError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Composite failed: {0}")]
    Composite(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Write failed: {0}")]
    Write(String),
}

impl From<BackendError> for JobError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Io(e) => JobError::Io(e),
            BackendError::Decode(m) => JobError::Decode(m),
            BackendError::Composite(m) => JobError::Composite(m),
            BackendError::Write(m) => JobError::Write(m),
        }
    }
}

impl JobError {
    /// Text for the error dialog shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            JobError::UnsupportedFormat(_) => "Only JPG allowed".to_string(),
            other => format!("I'm not able to write your new image. Sorry! Error: {other}"),
        }
    }
}

/// A file accepted for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    pub source_path: PathBuf,
    pub display_name: String,
    pub original_size_bytes: u64,
}

impl ImageJob {
    /// Create a job, measuring the source. Fails if the source cannot be read.
    pub fn receive(source_path: &Path, display_name: &str) -> Result<Self, JobError> {
        Ok(Self {
            source_path: source_path.to_path_buf(),
            display_name: display_name.to_string(),
            original_size_bytes: probe::size_of(source_path)?,
        })
    }
}

/// Outcome of a successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShrinkReport {
    pub output_path: PathBuf,
    pub original_size_bytes: u64,
    pub result_size_bytes: u64,
}

impl ShrinkReport {
    /// Percentage saved relative to the original, negative if the output grew.
    pub fn savings_percent(&self) -> f64 {
        if self.original_size_bytes == 0 {
            return 0.0;
        }
        100.0 * (1.0 - self.result_size_bytes as f64 / self.original_size_bytes as f64)
    }
}

pub type JobResult = Result<ShrinkReport, JobError>;

/// Status updates for whatever is presenting progress to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Started {
        display_name: String,
    },
    Shrunk {
        display_name: String,
        report: ShrinkReport,
    },
    Failed {
        display_name: String,
        message: String,
    },
}

/// One mutex per output path.
///
/// Entries are never evicted; a map lives for one batch.
#[derive(Default)]
pub struct DestinationLocks {
    slots: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DestinationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `path`. Equal paths always get the same lock.
    pub fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(path.to_path_buf()).or_default().clone()
    }
}

/// Everything a job needs, passed explicitly to every stage.
pub struct JobContext<'a, B: ImageBackend> {
    pub backend: &'a B,
    pub options: OutputOptions,
    pub watermark: WatermarkConfig,
    pub recents: Option<&'a dyn RecentDocuments>,
    pub events: Option<Sender<JobEvent>>,
    pub locks: DestinationLocks,
}

impl<'a, B: ImageBackend> JobContext<'a, B> {
    pub fn new(backend: &'a B, options: OutputOptions, watermark: WatermarkConfig) -> Self {
        Self {
            backend,
            options,
            watermark,
            recents: None,
            events: None,
            locks: DestinationLocks::new(),
        }
    }

    pub fn with_recents(mut self, recents: &'a dyn RecentDocuments) -> Self {
        self.recents = Some(recents);
        self
    }

    pub fn with_events(mut self, events: Sender<JobEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: JobEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                debug!("event receiver dropped");
            }
        }
    }

    fn register_recent(&self, path: &Path) {
        if let Some(recents) = self.recents {
            if let Err(e) = recents.add(path) {
                warn!(path = %path.display(), "could not update recent documents: {e}");
            }
        }
    }
}

/// Path of the staged copy for a given output path: `{output}.tmp`.
pub fn staging_path(output: &Path) -> PathBuf {
    let mut staged = OsString::from(output.as_os_str());
    staged.push(".");
    staged.push(STAGING_EXTENSION);
    PathBuf::from(staged)
}

/// A temporary copy of the source, deleted on drop.
struct StagedCopy {
    path: PathBuf,
}

impl StagedCopy {
    fn create(source: &Path, output: &Path) -> io::Result<Self> {
        // Guard first, so a half-written copy is still cleaned up.
        let staged = Self {
            path: staging_path(output),
        };
        std::fs::copy(source, &staged.path)?;
        debug!(staged = %staged.path.display(), "staged source copy");
        Ok(staged)
    }
}

impl Drop for StagedCopy {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(staged = %self.path.display(), "removed staged copy"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(staged = %self.path.display(), "could not remove staged copy: {e}"),
        }
    }
}

fn is_accepted(display_name: &str) -> bool {
    Path::new(display_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
}

/// Name shown to the user for a path: its file name, or the whole path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run_job<B: ImageBackend>(
    ctx: &JobContext<'_, B>,
    source: &Path,
    display_name: &str,
) -> JobResult {
    let job = ImageJob::receive(source, display_name)?;
    ctx.register_recent(&job.source_path);

    if !is_accepted(&job.display_name) {
        return Err(JobError::UnsupportedFormat(job.display_name));
    }

    let plan = planner::plan(&job.source_path, &ctx.options).map_err(|e| {
        JobError::Write(format!("cannot prepare output for {}: {e}", job.display_name))
    })?;

    let slot = ctx.locks.lock_for(&plan.full_path);
    let _held = slot.lock().unwrap_or_else(|e| e.into_inner());

    let staged = if ctx.options.needs_staging() {
        Some(StagedCopy::create(&job.source_path, &plan.full_path)?)
    } else {
        None
    };
    let input = staged.as_ref().map_or(job.source_path.as_path(), |s| s.path.as_path());

    let result_size_bytes = watermark_image(ctx.backend, input, &plan.full_path, &ctx.watermark)?;

    Ok(ShrinkReport {
        output_path: plan.full_path,
        original_size_bytes: job.original_size_bytes,
        result_size_bytes,
    })
}

/// Process a single file. Never panics; every failure becomes `Err`.
pub fn process<B: ImageBackend>(
    ctx: &JobContext<'_, B>,
    source: &Path,
    display_name: &str,
) -> JobResult {
    ctx.emit(JobEvent::Started {
        display_name: display_name.to_string(),
    });

    let result = run_job(ctx, source, display_name);
    match &result {
        Ok(report) => {
            info!(
                source = %source.display(),
                output = %report.output_path.display(),
                before = report.original_size_bytes,
                after = report.result_size_bytes,
                "shrunk image"
            );
            ctx.emit(JobEvent::Shrunk {
                display_name: display_name.to_string(),
                report: report.clone(),
            });
        }
        Err(e) => {
            error!(source = %source.display(), "job failed: {e}");
            ctx.emit(JobEvent::Failed {
                display_name: display_name.to_string(),
                message: e.user_message(),
            });
        }
    }
    result
}

/// Process every file in parallel. Results are in input order.
pub fn process_all<B: ImageBackend>(ctx: &JobContext<'_, B>, files: &[PathBuf]) -> Vec<JobResult> {
    files
        .par_iter()
        .map(|path| process(ctx, path, &display_name(path)))
        .collect()
}
