//! Resample orchestration.
//!
//! Drives loading, partitioning, reduction and persistence for a dataset at
//! one or more window counts.
//!
//! Pipeline per run:
//! 1. Guard the window count and, for bearing data, list the recordings
//! 2. Start a fresh output table
//! 3. Load recordings (bearing: one per file; KBM: one measurement per
//!    `base_rate` rows of the base table)
//! 4. Partition each recording into `window_count` windows and reduce each
//!    window to one summary row
//! 5. Append the rows and commit the table
//!
//! The KBM strategy holds the entire base-rate table in memory for the
//! duration of a run.

use crate::config::Config;
use crate::core::{load_bearing, load_kbm, partition, reduce_all, split_measurements, DatasetKind};
use crate::error::{ResampleError, Result};
use crate::report::RunReport;
use crate::sink::{output_path, ResampleSink};
use crate::{DEFAULT_BASE_RATE, DEFAULT_RESAMPLE_SIZES};
use std::path::{Path, PathBuf};

/// Measurements between progress log lines.
const PROGRESS_INTERVAL: usize = 100;

/// Downsamples one dataset into `<data_path>_<window_count>.csv` tables.
#[derive(Debug, Clone)]
pub struct Resampler {
    data_path: PathBuf,
    dataset: DatasetKind,
    num_features: usize,
    base_rate: usize,
    kbm_columns: Option<Vec<String>>,
}

impl Resampler {
    /// Create a resampler, inferring the dataset layout from `data_path`.
    pub fn new(data_path: impl Into<PathBuf>, num_features: usize) -> Self {
        let data_path = normalize(&data_path.into());
        Self {
            dataset: DatasetKind::from_path(&data_path),
            data_path,
            num_features,
            base_rate: DEFAULT_BASE_RATE,
            kbm_columns: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            data_path: normalize(&config.data_path),
            dataset: config.dataset_kind(),
            num_features: config.num_features,
            base_rate: config.base_rate,
            kbm_columns: config.kbm_columns.clone(),
        }
    }

    /// Override the inferred dataset layout.
    pub fn with_dataset(mut self, dataset: DatasetKind) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn with_base_rate(mut self, base_rate: usize) -> Self {
        self.base_rate = base_rate;
        self
    }

    /// Restrict the KBM base table to the named columns.
    pub fn with_kbm_columns(mut self, columns: Vec<String>) -> Self {
        self.kbm_columns = Some(columns);
        self
    }

    pub fn dataset(&self) -> DatasetKind {
        self.dataset
    }

    /// Resample to the default window counts (10, 30, 100, 300, 1000).
    pub fn resample_default(&self) -> Result<Vec<RunReport>> {
        self.resample_all(&DEFAULT_RESAMPLE_SIZES)
    }

    /// Resample to each window count in order, stopping at the first failure.
    pub fn resample_all(&self, sizes: &[usize]) -> Result<Vec<RunReport>> {
        sizes.iter().map(|&size| self.resample_data(size)).collect()
    }

    /// Resample to one window count using the dataset's strategy.
    pub fn resample_data(&self, window_count: usize) -> Result<RunReport> {
        tracing::info!(
            "Resampling {} ({}) to {}",
            self.data_path.display(),
            self.dataset,
            window_count
        );

        let report = match self.dataset {
            DatasetKind::Kbm => self.resample_data_kbm(window_count)?,
            DatasetKind::Bearing => self.resample_data_bearing(window_count)?,
        };

        tracing::info!(
            "Wrote {} rows from {} recordings to {} in {} ms",
            report.rows_written,
            report.recordings,
            report.output_path.display(),
            report.duration_ms()
        );
        Ok(report)
    }

    /// Bearing strategy: every file in the dataset directory is one recording.
    ///
    /// Files are processed in lexicographic order of their names.
    pub fn resample_data_bearing(&self, window_count: usize) -> Result<RunReport> {
        if window_count == 0 {
            return Err(ResampleError::invalid_size(0, "at least one window is required"));
        }

        // list before the sink stages anything next to the dataset
        let files = self.recording_files()?;

        let mut report = RunReport::start(DatasetKind::Bearing, &self.data_path, window_count);
        let mut sink = ResampleSink::create(&output_path(&self.data_path, window_count))?;

        for file in &files {
            let recording = load_bearing(file, self.num_features)?;
            let windows = partition(recording.view(), recording.id(), window_count)?;
            sink.append(&reduce_all(&windows))?;

            report.recordings += 1;
            tracing::debug!(
                "{}: {} samples -> {} rows",
                recording.id(),
                recording.len(),
                windows.len()
            );
        }

        let rows = sink.rows_written();
        Ok(report.finish(sink.commit()?, rows))
    }

    /// KBM strategy: the base-rate table is one continuous stream cut into
    /// measurements of exactly `base_rate` rows.
    pub fn resample_data_kbm(&self, window_count: usize) -> Result<RunReport> {
        if self.base_rate == 0 {
            return Err(ResampleError::invalid_size(window_count, "base rate must be at least 1"));
        }
        if window_count == self.base_rate {
            return Err(ResampleError::invalid_size(
                window_count,
                format!("equals the base rate {}", self.base_rate),
            ));
        }
        if window_count == 0 {
            return Err(ResampleError::invalid_size(0, "at least one window is required"));
        }
        if window_count > self.base_rate {
            return Err(ResampleError::InsufficientSamples {
                recording: format!("{} measurement", self.data_path.display()),
                len: self.base_rate,
                window_count,
            });
        }

        let mut report = RunReport::start(DatasetKind::Kbm, &self.data_path, window_count);
        let mut sink = ResampleSink::create(&output_path(&self.data_path, window_count))?;

        let table = load_kbm(
            &self.base_table_path(),
            self.num_features,
            self.kbm_columns.as_deref(),
        )?;
        let measurements = split_measurements(&table, self.base_rate);
        if measurements.dropped > 0 {
            tracing::warn!(
                "{}: dropping {} trailing rows that do not fill a {}-sample measurement",
                table.id(),
                measurements.dropped,
                self.base_rate
            );
        }

        let total = measurements.chunks.len();
        for (i, measurement) in measurements.chunks.iter().enumerate() {
            let recording = format!("{}#{}", table.id(), measurement.index);
            let windows = partition(*measurement, &recording, window_count)?;
            sink.append(&reduce_all(&windows))?;

            report.recordings += 1;
            if (i + 1) % PROGRESS_INTERVAL == 0 {
                tracing::debug!("{}: {}/{} measurements", table.id(), i + 1, total);
            }
        }

        report.dropped_rows = measurements.dropped as u64;
        let rows = sink.rows_written();
        Ok(report.finish(sink.commit()?, rows))
    }

    /// The KBM base-rate table: `<data_path>_<base_rate>.csv`.
    pub fn base_table_path(&self) -> PathBuf {
        output_path(&self.data_path, self.base_rate)
    }

    /// Recording files of a bearing dataset, sorted by file name.
    pub fn recording_files(&self) -> Result<Vec<PathBuf>> {
        let entries =
            std::fs::read_dir(&self.data_path).map_err(|e| ResampleError::io(&self.data_path, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ResampleError::io(&self.data_path, e))?;
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(ResampleError::EmptyDataset {
                path: self.data_path.clone(),
            });
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }
}

/// Drop trailing separators and `.` segments so output tables land beside
/// the dataset directory rather than inside it.
fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}
