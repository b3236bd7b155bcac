//! Sensor Resampler - deterministic downsampling of vibration recordings.
//!
//! Raw high-frequency accelerometer recordings from the bearing and KBM
//! datasets are reduced to lower-frequency tables: each recording is split
//! into a fixed number of near-equal windows and each window becomes one row
//! holding the mean absolute value of every channel.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          Resampler                            │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌─────────────┐   ┌──────────┐   ┌────────┐  │
//! │  │ Recording │──▶│  Windowing  │──▶│  Reduce  │──▶│  Sink  │  │
//! │  │  loader   │   │ (N windows) │   │(mean |x|)│   │ (;csv) │  │
//! │  └───────────┘   └─────────────┘   └──────────┘   └────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sensor_resampler::Resampler;
//!
//! // Writes data/bearing/1st_test_10.csv, _30.csv, ... _1000.csv
//! let reports = Resampler::new("data/bearing/1st_test", 4)
//!     .resample_default()
//!     .expect("resample failed");
//! println!("{} tables written", reports.len());
//! ```

pub mod cleaning;
pub mod config;
pub mod core;
pub mod error;
pub mod report;
pub mod resampler;
pub mod sink;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{DatasetKind, Recording, SummaryRow, Window};
pub use error::{ResampleError, Result};
pub use report::{RunLog, RunReport};
pub use resampler::Resampler;
pub use sink::ResampleSink;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Window counts produced by a default batch run.
pub const DEFAULT_RESAMPLE_SIZES: [usize; 5] = [10, 30, 100, 300, 1000];

/// Samples per KBM measurement at the original sampling rate.
pub const DEFAULT_BASE_RATE: usize = 4000;

/// Channels per bearing recording.
pub const DEFAULT_NUM_FEATURES: usize = 4;
