//! Output table persistence.
//!
//! Rows are appended to a staging file next to the target and flushed after
//! every batch. The staging file replaces the target atomically on
//! [`ResampleSink::commit`]; dropping an uncommitted sink removes it, so an
//! interrupted run never leaves a half-written table under the final name.

use crate::core::SummaryRow;
use crate::error::{ResampleError, Result};
use std::fmt::Write as _;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Field separator of resampled tables.
pub const OUTPUT_SEPARATOR: char = ';';

/// Path of the resampled table for `data_path` at `window_count`:
/// `<data_path>_<window_count>.csv`. A trailing separator on `data_path` is
/// ignored, so the table is always a sibling of a dataset directory.
pub fn output_path(data_path: &Path, window_count: usize) -> PathBuf {
    let stem: PathBuf = data_path.components().collect();
    let mut name = stem.into_os_string();
    name.push(format!("_{window_count}.csv"));
    PathBuf::from(name)
}

/// Render one summary row as a line (without the newline).
pub fn format_row(row: &SummaryRow) -> String {
    let mut line = String::new();
    for (i, value) in row.values().iter().enumerate() {
        if i > 0 {
            line.push(OUTPUT_SEPARATOR);
        }
        let _ = write!(line, "{value}");
    }
    line
}

/// Single-writer, append-only sink for one resampled table.
pub struct ResampleSink {
    target: PathBuf,
    writer: BufWriter<NamedTempFile>,
    rows_written: u64,
}

impl ResampleSink {
    /// Start a fresh table for `target`.
    ///
    /// Any existing table at `target` is removed first so a failed run
    /// cannot be mistaken for a complete one.
    pub fn create(target: &Path) -> Result<Self> {
        remove_stale(target)?;

        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| ResampleError::io(&dir, e))?;

        let staging = tempfile::Builder::new()
            .prefix(".resample-")
            .suffix(".partial")
            .tempfile_in(&dir)
            .map_err(|e| ResampleError::io(&dir, e))?;

        Ok(Self {
            target: target.to_path_buf(),
            writer: BufWriter::new(staging),
            rows_written: 0,
        })
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Append rows and flush them to the staging file.
    pub fn append(&mut self, rows: &[SummaryRow]) -> Result<()> {
        for row in rows {
            writeln!(self.writer, "{}", format_row(row))
                .map_err(|e| ResampleError::io(&self.target, e))?;
        }
        self.writer
            .flush()
            .map_err(|e| ResampleError::io(&self.target, e))?;
        self.rows_written += rows.len() as u64;
        Ok(())
    }

    /// Sync the staged table and move it into place.
    pub fn commit(self) -> Result<PathBuf> {
        let target = self.target;
        let staging = self
            .writer
            .into_inner()
            .map_err(|e| ResampleError::io(&target, e.into_error()))?;
        staging
            .as_file()
            .sync_all()
            .map_err(|e| ResampleError::io(&target, e))?;
        staging
            .persist(&target)
            .map_err(|e| ResampleError::io(&target, e.error))?;
        Ok(target)
    }
}

fn remove_stale(target: &Path) -> Result<()> {
    match std::fs::remove_file(target) {
        Ok(()) => {
            tracing::debug!("Removed previous table {}", target.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ResampleError::Io {
            path: target.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("data/kbm_dataset/pumpe_v3"), 100),
            PathBuf::from("data/kbm_dataset/pumpe_v3_100.csv")
        );
        assert_eq!(
            output_path(Path::new("data/bearing/1st_test/"), 10),
            PathBuf::from("data/bearing/1st_test_10.csv")
        );
    }

    #[test]
    fn test_format_row() {
        let row = SummaryRow(vec![0.5, 1.0, 0.125, 2.25]);
        assert_eq!(format_row(&row), "0.5;1;0.125;2.25");
    }

    #[test]
    fn test_append_and_commit() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("bearing_10.csv");

        let mut sink = ResampleSink::create(&target).unwrap();
        sink.append(&[SummaryRow(vec![1.5, 2.0])]).unwrap();
        sink.append(&[SummaryRow(vec![0.25, 3.0])]).unwrap();
        assert_eq!(sink.rows_written(), 2);
        assert!(!target.exists());

        sink.commit().unwrap();
        let content = std::fs::read_to_string(&target).unwrap();
        assert_eq!(content, "1.5;2\n0.25;3\n");
    }

    #[test]
    fn test_create_removes_previous_table() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("bearing_10.csv");
        std::fs::write(&target, "stale\n").unwrap();

        let sink = ResampleSink::create(&target).unwrap();
        assert!(!target.exists());

        sink.commit().unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "");
    }

    #[test]
    fn test_dropped_sink_leaves_no_files() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("bearing_10.csv");

        {
            let mut sink = ResampleSink::create(&target).unwrap();
            sink.append(&[SummaryRow(vec![1.0])]).unwrap();
        }

        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
