use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use decompressor_logging::{LogEvent, Logger};

use crate::codec::BlobCodec;
use crate::error::SessionError;
use crate::outcome::{BatchSummary, FileOutcome};
use crate::pipeline::{pack_session, process_session, ProcessOptions, SessionOutcome};

/// What a batch does with each discovered file.
#[derive(Debug, Clone)]
pub enum BatchMode {
    /// Decompress archived sessions into clean export envelopes
    Export(ProcessOptions),
    /// Compress exported sessions back into the archive format
    Pack(BlobCodec),
}

/// Settings for one batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub mode: BatchMode,
    /// Files processed at the same time (at least 1)
    pub jobs: usize,
}

impl BatchConfig {
    pub fn new(source_dir: PathBuf, output_dir: PathBuf, mode: BatchMode) -> Self {
        Self {
            source_dir,
            output_dir,
            mode,
            jobs: 1,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }
}

/// List the session files of `dir`: regular, non-hidden files sorted by name.
pub fn discover_sessions(dir: &Path) -> Result<Vec<PathBuf>, SessionError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SessionError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SessionError::io(dir, e))?;
        let path = entry.path();

        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !path.is_file() {
            continue;
        }
        files.push(path);
    }

    files.sort();
    Ok(files)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read, transform and write one file. Never panics on bad input; every
/// failure becomes [`FileOutcome::Failed`].
pub fn process_file(path: &Path, output_dir: &Path, mode: &BatchMode) -> FileOutcome {
    let file = file_label(path);
    match try_process_file(path, output_dir, mode) {
        Ok(outcome) => outcome,
        Err(e) => FileOutcome::Failed {
            file,
            error: e.to_string(),
        },
    }
}

fn try_process_file(
    path: &Path,
    output_dir: &Path,
    mode: &BatchMode,
) -> Result<FileOutcome, SessionError> {
    let file = file_label(path);
    let base_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.clone());

    let raw_text = std::fs::read_to_string(path).map_err(|e| SessionError::io(path, e))?;

    let outcome = match mode {
        BatchMode::Export(options) => process_session(&raw_text, options)?,
        BatchMode::Pack(codec) => pack_session(&raw_text, codec)?,
    };

    let session = match outcome {
        SessionOutcome::Processed(session) => session,
        SessionOutcome::Skipped(reason) => {
            return Ok(FileOutcome::Skipped {
                file,
                reason: reason.to_string(),
            })
        }
    };

    let output_path = session.serialized.write(&base_name, output_dir)?;

    Ok(FileOutcome::Exported {
        file,
        name: session.name.unwrap_or(base_name),
        output_path,
        categories: session.categories,
        stripped: session.stripped,
        dedupe: session.dedupe,
    })
}

/// Runs a directory of sessions through the pipeline
pub struct BatchRunner {
    config: BatchConfig,
    logger: Arc<Logger>,
    interrupted: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(config: BatchConfig, logger: Arc<Logger>) -> Self {
        Self {
            config,
            logger,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle to signal interruption
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Process every file of the source directory.
    ///
    /// Only a missing source directory or an uncreatable output directory
    /// fails the run; per-file problems are recorded in the summary.
    pub async fn run(&self) -> Result<BatchSummary, SessionError> {
        let started = Instant::now();
        let output_dir = self.config.output_dir.clone();

        std::fs::create_dir_all(&output_dir).map_err(|e| SessionError::io(&output_dir, e))?;
        let files = discover_sessions(&self.config.source_dir)?;

        self.logger.log(&LogEvent::BatchStarted {
            source_dir: self.config.source_dir.clone(),
            output_dir: output_dir.clone(),
            files: files.len(),
        });
        for path in &files {
            self.logger.log(&LogEvent::FileDiscovered {
                file: file_label(path),
            });
        }

        let mut summary = BatchSummary::default();
        let mut in_flight = JoinSet::new();
        let total = files.len();

        for (index, path) in files.into_iter().enumerate() {
            if self.interrupted.load(Ordering::SeqCst) {
                info!("Batch interrupted by user");
                let remaining = total - index;
                summary.mark_interrupted(remaining);
                self.logger.log(&LogEvent::BatchInterrupted { remaining });
                break;
            }

            while in_flight.len() >= self.config.jobs {
                if let Some(joined) = in_flight.join_next().await {
                    self.finish_file(joined, &mut summary);
                }
            }

            debug!(file = %path.display(), "Scheduling session");
            let output_dir = output_dir.clone();
            let mode = self.config.mode.clone();
            in_flight.spawn_blocking(move || process_file(&path, &output_dir, &mode));
        }

        while let Some(joined) = in_flight.join_next().await {
            self.finish_file(joined, &mut summary);
        }

        summary.finish(started.elapsed());
        self.logger.log(&LogEvent::BatchCompleted {
            processed: summary.processed,
            skipped: summary.skipped,
            failed: summary.failed,
            duration_secs: summary.total_duration_secs,
        });

        Ok(summary)
    }

    fn finish_file(
        &self,
        joined: Result<FileOutcome, tokio::task::JoinError>,
        summary: &mut BatchSummary,
    ) {
        let outcome = joined.unwrap_or_else(|e| {
            warn!(error = %e, "Session task did not complete");
            FileOutcome::Failed {
                file: "<unknown>".to_string(),
                error: e.to_string(),
            }
        });
        self.report(&outcome);
        summary.record(outcome);
    }

    fn report(&self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Exported {
                file,
                name,
                output_path,
                categories,
                stripped,
                dedupe,
            } => match self.config.mode {
                BatchMode::Export(_) => {
                    self.logger.log(&LogEvent::SessionDecoded {
                        file: file.clone(),
                        categories: categories.clone(),
                    });
                    for category in stripped {
                        self.logger.log(&LogEvent::CategoryStripped {
                            file: file.clone(),
                            category: category.clone(),
                        });
                    }
                    if let Some(stats) = dedupe {
                        self.logger.log(&LogEvent::DuplicatesRemoved {
                            file: file.clone(),
                            kept: stats.kept,
                            removed: stats.removed,
                        });
                    }
                    self.logger.log(&LogEvent::SessionExported {
                        file: file.clone(),
                        name: name.clone(),
                        output_path: output_path.clone(),
                    });
                }
                BatchMode::Pack(_) => {
                    self.logger.log(&LogEvent::SessionPacked {
                        file: file.clone(),
                        output_path: output_path.clone(),
                    });
                }
            },
            FileOutcome::Skipped { file, reason } => {
                self.logger.log(&LogEvent::SessionSkipped {
                    file: file.clone(),
                    reason: reason.clone(),
                });
            }
            FileOutcome::Failed { file, error } => {
                warn!(file = %file, error = %error, "Session failed");
                self.logger.log(&LogEvent::SessionFailed {
                    file: file.clone(),
                    error: error.clone(),
                });
            }
        }
    }
}
