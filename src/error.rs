//! Error types for the resampler.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised while loading, windowing or persisting recordings.
///
/// Trailing rows that do not form a full KBM measurement are not an error;
/// they are dropped, logged and counted in the run report.
#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("Input not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("Malformed row in {} at line {line}: {reason}", path.display())]
    MalformedRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Invalid resample size {window_count}: {reason}")]
    InvalidResampleSize { window_count: usize, reason: String },

    #[error("Recording {recording} has {len} samples, cannot split into {window_count} windows")]
    InsufficientSamples {
        recording: String,
        len: usize,
        window_count: usize,
    },

    #[error("No recordings found in {}", path.display())]
    EmptyDataset { path: PathBuf },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResampleError {
    /// Wrap an IO error, mapping `NotFound` to [`ResampleError::MissingFile`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            ResampleError::MissingFile { path }
        } else {
            ResampleError::Io { path, source }
        }
    }

    pub(crate) fn invalid_size(window_count: usize, reason: impl Into<String>) -> Self {
        ResampleError::InvalidResampleSize {
            window_count,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(
        path: &std::path::Path,
        line: usize,
        reason: impl Into<String>,
    ) -> Self {
        ResampleError::MalformedRow {
            path: path.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ResampleError>;
