use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::dedupe::DedupeStats;

/// Result of handling one file of a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Session written to the output directory
    Exported {
        file: String,
        name: String,
        output_path: PathBuf,
        categories: Vec<String>,
        stripped: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dedupe: Option<DedupeStats>,
    },
    /// File left alone because it lacks the expected fields
    Skipped { file: String, reason: String },
    /// Decoding, serialization or writing failed
    Failed { file: String, error: String },
}

impl FileOutcome {
    pub fn file(&self) -> &str {
        match self {
            FileOutcome::Exported { file, .. }
            | FileOutcome::Skipped { file, .. }
            | FileOutcome::Failed { file, .. } => file,
        }
    }
}

/// Aggregate result of a batch run
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Files never started because the run was interrupted
    pub remaining: usize,
    pub interrupted: bool,
    pub total_duration_secs: f64,
    pub files: Vec<FileOutcome>,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Exported { .. } => self.processed += 1,
            FileOutcome::Skipped { .. } => self.skipped += 1,
            FileOutcome::Failed { .. } => self.failed += 1,
        }
        self.files.push(outcome);
    }

    pub fn mark_interrupted(&mut self, remaining: usize) {
        self.interrupted = true;
        self.remaining = remaining;
    }

    pub fn finish(&mut self, duration: Duration) {
        self.total_duration_secs = duration.as_secs_f64();
        self.files.sort_by(|a, b| a.file().cmp(b.file()));
    }

    /// Get the exit code for this run
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else if self.interrupted {
            130
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let mut summary = BatchSummary::default();
        summary.record(FileOutcome::Skipped {
            file: "a.json".to_string(),
            reason: "no metadata found".to_string(),
        });
        assert_eq!(summary.exit_code(), 0);

        summary.mark_interrupted(3);
        assert_eq!(summary.exit_code(), 130);

        summary.record(FileOutcome::Failed {
            file: "b.json".to_string(),
            error: "boom".to_string(),
        });
        assert_eq!(summary.exit_code(), 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_finish_orders_files() {
        let mut summary = BatchSummary::default();
        for file in ["c.json", "a.json", "b.json"] {
            summary.record(FileOutcome::Skipped {
                file: file.to_string(),
                reason: String::new(),
            });
        }
        summary.finish(Duration::from_millis(1500));

        let files: Vec<&str> = summary.files.iter().map(FileOutcome::file).collect();
        assert_eq!(files, vec!["a.json", "b.json", "c.json"]);
        assert!((summary.total_duration_secs - 1.5).abs() < f64::EPSILON);
    }
}
