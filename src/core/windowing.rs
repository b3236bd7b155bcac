//! Window partitioning.
//!
//! A recording of `len` samples is split into `window_count` contiguous,
//! non-overlapping windows. The first `len % window_count` windows carry one
//! extra sample, so window sizes never differ by more than one.

use crate::core::recording::Recording;
use crate::error::{ResampleError, Result};
use std::ops::Range;

/// A contiguous run of samples borrowed from a recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window<'a> {
    /// Position of this window within its parent
    pub index: usize,
    channels: usize,
    samples: &'a [f64],
}

impl<'a> Window<'a> {
    pub(crate) fn new(index: usize, channels: usize, samples: &'a [f64]) -> Self {
        Self {
            index,
            channels: channels.max(1),
            samples,
        }
    }

    /// Number of samples (rows) in the window.
    pub fn len(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Iterate over the window's samples in order.
    pub fn rows(&self) -> impl Iterator<Item = &'a [f64]> + 'a {
        let samples = self.samples;
        samples.chunks_exact(self.channels)
    }

    /// Iterate over the values of a single channel in order.
    pub fn column(&self, channel: usize) -> impl Iterator<Item = f64> + 'a {
        let samples = self.samples;
        samples
            .iter()
            .skip(channel)
            .step_by(self.channels)
            .copied()
    }

    /// Borrow a sub-range of rows as a new window.
    fn slice(&self, index: usize, rows: Range<usize>) -> Window<'a> {
        let samples = self.samples;
        Window::new(
            index,
            self.channels,
            &samples[rows.start * self.channels..rows.end * self.channels],
        )
    }
}

/// Compute the row ranges of a near-equal split of `len` rows.
///
/// Callers must ensure `1 <= window_count <= len`.
pub fn partition_ranges(len: usize, window_count: usize) -> Vec<Range<usize>> {
    let base = len / window_count;
    let extra = len % window_count;

    let mut ranges = Vec::with_capacity(window_count);
    let mut start = 0;
    for i in 0..window_count {
        let size = base + usize::from(i < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// Split a window (usually a whole recording or one measurement) into
/// `window_count` near-equal windows.
///
/// Fails with `InvalidResampleSize` for zero windows and with
/// `InsufficientSamples` when a window would be empty.
pub fn partition<'a>(
    source: Window<'a>,
    recording: &str,
    window_count: usize,
) -> Result<Vec<Window<'a>>> {
    let len = source.len();
    if window_count == 0 {
        return Err(ResampleError::invalid_size(0, "at least one window is required"));
    }
    if window_count > len {
        return Err(ResampleError::InsufficientSamples {
            recording: recording.to_string(),
            len,
            window_count,
        });
    }

    Ok(partition_ranges(len, window_count)
        .into_iter()
        .enumerate()
        .map(|(index, rows)| source.slice(index, rows))
        .collect())
}

/// Fixed-length measurements carved out of one continuous recording.
#[derive(Debug)]
pub struct Measurements<'a> {
    /// Full measurements, in stream order
    pub chunks: Vec<Window<'a>>,
    /// Trailing rows that did not fill a whole measurement
    pub dropped: usize,
}

/// Cut a continuous recording into measurements of exactly `base_rate` rows.
///
/// The trailing `len % base_rate` rows cannot be resampled consistently and
/// are left out.
pub fn split_measurements(recording: &Recording, base_rate: usize) -> Measurements<'_> {
    let view = recording.view();
    if base_rate == 0 {
        return Measurements {
            chunks: Vec::new(),
            dropped: view.len(),
        };
    }

    let count = view.len() / base_rate;
    let chunks = (0..count)
        .map(|i| view.slice(i, i * base_rate..(i + 1) * base_rate))
        .collect();

    Measurements {
        chunks,
        dropped: view.len() % base_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, channels: usize) -> Recording {
        let samples = (0..len * channels).map(|v| v as f64).collect();
        Recording::new("ramp", channels, samples)
    }

    #[test]
    fn test_partition_ranges_even() {
        let ranges = partition_ranges(20480, 10);
        assert_eq!(ranges.len(), 10);
        assert!(ranges.iter().all(|r| r.len() == 2048));
        assert_eq!(ranges[9].end, 20480);
    }

    #[test]
    fn test_partition_ranges_uneven() {
        let ranges = partition_ranges(10, 3);
        assert_eq!(ranges, vec![0..4, 4..7, 7..10]);
    }

    #[test]
    fn test_partition_coverage() {
        for len in 1..60 {
            for count in 1..=len {
                let ranges = partition_ranges(len, count);
                let sizes: Vec<usize> = ranges.iter().map(|r| r.len()).collect();

                assert_eq!(sizes.iter().sum::<usize>(), len);
                let max = sizes.iter().max().unwrap();
                let min = sizes.iter().min().unwrap();
                assert!(max - min <= 1, "len={len} count={count}");

                // contiguous, in order, no gaps or overlap
                let mut expected_start = 0;
                for r in &ranges {
                    assert_eq!(r.start, expected_start);
                    expected_start = r.end;
                }
                assert_eq!(expected_start, len);
            }
        }
    }

    #[test]
    fn test_partition_preserves_order() {
        let rec = ramp(7, 2);
        let windows = partition(rec.view(), rec.id(), 3).unwrap();

        let rebuilt: Vec<f64> = windows
            .iter()
            .flat_map(|w| w.rows().flatten().copied().collect::<Vec<_>>())
            .collect();
        let original: Vec<f64> = rec.view().rows().flatten().copied().collect();
        assert_eq!(rebuilt, original);
        assert_eq!(windows.iter().map(|w| w.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_partition_rejects_degenerate_counts() {
        let rec = ramp(5, 1);
        assert!(matches!(
            partition(rec.view(), "ramp", 0),
            Err(ResampleError::InvalidResampleSize { window_count: 0, .. })
        ));
        assert!(matches!(
            partition(rec.view(), "ramp", 6),
            Err(ResampleError::InsufficientSamples { len: 5, .. })
        ));
    }

    #[test]
    fn test_window_column() {
        let rec = ramp(3, 2);
        let view = rec.view();
        assert_eq!(view.column(0).collect::<Vec<_>>(), vec![0.0, 2.0, 4.0]);
        assert_eq!(view.column(1).collect::<Vec<_>>(), vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_split_measurements_truncates() {
        let rec = ramp(12500, 1);
        let measurements = split_measurements(&rec, 4000);

        assert_eq!(measurements.chunks.len(), 3);
        assert_eq!(measurements.dropped, 500);
        assert!(measurements.chunks.iter().all(|m| m.len() == 4000));

        // last kept value is row 11999
        let last = measurements.chunks[2].column(0).last().unwrap();
        assert_eq!(last, 11999.0);
    }

    #[test]
    fn test_split_measurements_exact_multiple() {
        let rec = ramp(8000, 3);
        let measurements = split_measurements(&rec, 4000);
        assert_eq!(measurements.chunks.len(), 2);
        assert_eq!(measurements.dropped, 0);
    }
}
