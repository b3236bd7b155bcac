//! Run reporting.
//!
//! Each resample run produces a [`RunReport`]; a [`RunLog`] collects the
//! reports of one invocation for display and optional persistence.

use crate::core::DatasetKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Outcome of resampling one dataset at one window count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub dataset: DatasetKind,
    pub data_path: PathBuf,
    pub window_count: usize,
    pub output_path: PathBuf,
    /// Files (bearing) or measurements (KBM) reduced
    pub recordings: u64,
    pub rows_written: u64,
    /// Trailing KBM rows left out of every measurement
    pub dropped_rows: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub(crate) fn start(dataset: DatasetKind, data_path: &Path, window_count: usize) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            dataset,
            data_path: data_path.to_path_buf(),
            window_count,
            output_path: PathBuf::new(),
            recordings: 0,
            rows_written: 0,
            dropped_rows: 0,
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn finish(mut self, output_path: PathBuf, rows_written: u64) -> Self {
        self.output_path = output_path;
        self.rows_written = rows_written;
        self.finished_at = Utc::now();
        self
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Reports of every run in one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    pub started_at: DateTime<Utc>,
    pub runs: Vec<RunReport>,
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            runs: Vec::new(),
        }
    }

    pub fn record(&mut self, report: RunReport) {
        self.runs.push(report);
    }

    pub fn total_rows(&self) -> u64 {
        self.runs.iter().map(|r| r.rows_written).sum()
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Resample Summary:\n\
             - Runs completed: {}\n\
             - Rows written: {}",
            self.runs.len(),
            self.total_rows()
        );
        for run in &self.runs {
            out.push_str(&format!(
                "\n  [{}] {} -> {} ({} recordings, {} rows",
                run.window_count,
                run.data_path.display(),
                run.output_path.display(),
                run.recordings,
                run.rows_written
            ));
            if run.dropped_rows > 0 {
                out.push_str(&format!(", {} trailing rows dropped", run.dropped_rows));
            }
            out.push(')');
        }
        out
    }

    /// Save the log to disk as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load a previously saved log.
    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(std::io::Error::other)
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn report(window_count: usize, rows: u64, dropped: u64) -> RunReport {
        let mut r = RunReport::start(DatasetKind::Kbm, Path::new("data/kbm"), window_count);
        r.recordings = 3;
        r.dropped_rows = dropped;
        r.finish(PathBuf::from(format!("data/kbm_{window_count}.csv")), rows)
    }

    #[test]
    fn test_run_log_totals() {
        let mut log = RunLog::new();
        log.record(report(10, 30, 0));
        log.record(report(100, 300, 500));

        assert_eq!(log.total_rows(), 330);
        assert!(log.runs[1].duration_ms() >= 0);
    }

    #[test]
    fn test_summary_format() {
        let mut log = RunLog::new();
        log.record(report(100, 300, 500));
        let summary = log.summary();

        assert!(summary.contains("Runs completed: 1"));
        assert!(summary.contains("data/kbm_100.csv"));
        assert!(summary.contains("500 trailing rows dropped"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("run.json");

        let mut log = RunLog::new();
        log.record(report(10, 30, 0));
        log.save(&path).unwrap();

        let loaded = RunLog::load(&path).unwrap();
        assert_eq!(loaded.runs.len(), 1);
        assert_eq!(loaded.runs[0].run_id, log.runs[0].run_id);
        assert_eq!(loaded.runs[0].dataset, DatasetKind::Kbm);
    }
}
