use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Structured log events for a decompression batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    BatchStarted {
        source_dir: PathBuf,
        output_dir: PathBuf,
        files: usize,
    },
    FileDiscovered {
        file: String,
    },
    SessionDecoded {
        file: String,
        categories: Vec<String>,
    },
    CategoryStripped {
        file: String,
        category: String,
    },
    DuplicatesRemoved {
        file: String,
        kept: usize,
        removed: usize,
    },
    SessionExported {
        file: String,
        name: String,
        output_path: PathBuf,
    },
    SessionPacked {
        file: String,
        output_path: PathBuf,
    },
    SessionSkipped {
        file: String,
        reason: String,
    },
    SessionFailed {
        file: String,
        error: String,
    },
    BatchInterrupted {
        remaining: usize,
    },
    BatchCompleted {
        processed: usize,
        skipped: usize,
        failed: usize,
        duration_secs: f64,
    },
}

impl LogEvent {
    /// Events that are only rendered on the console in verbose mode.
    /// The file log always receives every event.
    pub fn is_verbose_only(&self) -> bool {
        matches!(
            self,
            LogEvent::FileDiscovered { .. } | LogEvent::SessionDecoded { .. }
        )
    }

    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for batch events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    verbose: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            verbose: false,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            verbose: false,
            file_writer: Some(Mutex::new(file)),
        })
    }

    /// Show per-file detail events on the console.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON and never filtered
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if event.is_verbose_only() && !self.verbose {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::BatchStarted {
                source_dir,
                output_dir,
                files,
            } => {
                let _ = writeln!(stderr, "{}", "Start processing...".bold().bright_white());
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "Source:".dimmed(),
                    source_dir.display()
                );
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "Output:".dimmed(),
                    output_dir.display()
                );
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "Found:".dimmed(),
                    files,
                    if *files == 1 { "file" } else { "files" }
                );
                let _ = writeln!(stderr);
            }
            LogEvent::FileDiscovered { file } => {
                let _ = writeln!(stderr, "{} {}", "▶".bright_cyan(), file.bright_cyan());
            }
            LogEvent::SessionDecoded { categories, .. } => {
                let listed = if categories.is_empty() {
                    "none".to_string()
                } else {
                    categories.join(", ")
                };
                let _ = writeln!(
                    stderr,
                    "    {} {}",
                    "Decompressed, categories:".dimmed(),
                    listed.dimmed()
                );
            }
            LogEvent::CategoryStripped { category, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Unset {}",
                    "-".bright_yellow(),
                    category.bright_yellow()
                );
            }
            LogEvent::DuplicatesRemoved { kept, removed, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Network: kept {}, removed {} {}",
                    "~".bright_magenta(),
                    kept,
                    format!("{}", removed).bright_magenta(),
                    if *removed == 1 { "duplicate" } else { "duplicates" }
                );
            }
            LogEvent::SessionExported {
                name, output_path, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "{} {} {} {}",
                    "✓".bright_green(),
                    name.bold(),
                    "→".dimmed(),
                    output_path.display()
                );
            }
            LogEvent::SessionPacked { file, output_path } => {
                let _ = writeln!(
                    stderr,
                    "{} {} {} {}",
                    "✓".bright_green(),
                    file.bold(),
                    "→".dimmed(),
                    output_path.display()
                );
            }
            LogEvent::SessionSkipped { file, reason } => {
                let _ = writeln!(
                    stderr,
                    "{} Skipped {}: {}",
                    "⚠".bright_yellow(),
                    file,
                    reason.dimmed()
                );
            }
            LogEvent::SessionFailed { file, error } => {
                let _ = writeln!(
                    stderr,
                    "{} Error processing {}: {}",
                    "✗".bright_red(),
                    file,
                    error.bright_red()
                );
            }
            LogEvent::BatchInterrupted { remaining } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Interrupted, {} file(s) not processed",
                    "⚠".bright_yellow(),
                    remaining
                );
            }
            LogEvent::BatchCompleted {
                processed,
                skipped,
                failed,
                duration_secs,
            } => {
                let _ = writeln!(stderr);
                let failed_text = if *failed > 0 {
                    format!("{} failed", failed).bright_red().to_string()
                } else {
                    format!("{} failed", failed).dimmed().to_string()
                };
                let _ = writeln!(
                    stderr,
                    "{} {} processed, {} skipped, {} ({:.1}s)",
                    "All files processed:".bold(),
                    processed,
                    skipped,
                    failed_text,
                    duration_secs
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::BatchStarted { files, .. } => {
                format!("[{}] batch:start files={}", timestamp, files)
            }
            LogEvent::FileDiscovered { file } => format!("[{}] file:{}", timestamp, file),
            LogEvent::SessionDecoded { file, categories } => format!(
                "[{}] decoded:{} [{}]",
                timestamp,
                file,
                categories.join(",")
            ),
            LogEvent::CategoryStripped { file, category } => {
                format!("[{}] strip:{} {}", timestamp, file, category)
            }
            LogEvent::DuplicatesRemoved {
                file,
                kept,
                removed,
            } => format!(
                "[{}] dedupe:{} kept={} removed={}",
                timestamp, file, kept, removed
            ),
            LogEvent::SessionExported {
                file, output_path, ..
            } => format!(
                "[{}] export:{} {}",
                timestamp,
                file,
                output_path.display()
            ),
            LogEvent::SessionPacked { file, output_path } => format!(
                "[{}] pack:{} {}",
                timestamp,
                file,
                output_path.display()
            ),
            LogEvent::SessionSkipped { file, reason } => {
                format!("[{}] skip:{} {}", timestamp, file, reason)
            }
            LogEvent::SessionFailed { file, error } => {
                format!("[{}] error:{} {}", timestamp, file, error)
            }
            LogEvent::BatchInterrupted { remaining } => {
                format!("[{}] batch:interrupted remaining={}", timestamp, remaining)
            }
            LogEvent::BatchCompleted {
                processed,
                skipped,
                failed,
                duration_secs,
            } => format!(
                "[{}] batch:done ok={} skip={} fail={} {:.1}s",
                timestamp, processed, skipped, failed, duration_secs
            ),
        };
        let _ = writeln!(stderr, "{}", msg);
    }
}
