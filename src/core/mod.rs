//! Numeric core of the resampler.
//!
//! This module contains:
//! - Recording loading for both dataset layouts
//! - Near-equal window partitioning and measurement chunking
//! - Mean-of-absolute-value window reduction

pub mod recording;
pub mod reduce;
pub mod windowing;

// Re-export commonly used types
pub use recording::{load_bearing, load_kbm, DatasetKind, Recording};
pub use reduce::{mean_abs, reduce_all, SummaryRow};
pub use windowing::{partition, partition_ranges, split_measurements, Measurements, Window};
