//! Window reduction.
//!
//! Every window collapses to one summary row: the mean of absolute values of
//! each channel.

use crate::core::windowing::Window;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// One reduced window; width equals the source channel count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow(pub Vec<f64>);

impl SummaryRow {
    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

/// Reduce a window to the per-channel mean of absolute values.
///
/// Empty windows are rejected by the partitioner, so every mean here is over
/// at least one sample.
pub fn mean_abs(window: &Window<'_>) -> SummaryRow {
    let row = (0..window.channels())
        .map(|channel| window.column(channel).map(f64::abs).mean())
        .collect();
    SummaryRow(row)
}

/// Reduce every window in order.
pub fn reduce_all(windows: &[Window<'_>]) -> Vec<SummaryRow> {
    windows.iter().map(mean_abs).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::recording::Recording;
    use crate::core::windowing::partition;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_mean_abs_basic() {
        let rec = Recording::from_rows(
            "r",
            &[vec![1.0, -2.0], vec![-3.0, 4.0], vec![5.0, -6.0]],
        );
        let row = mean_abs(&rec.view());

        assert_eq!(row.values().len(), 2);
        assert!(approx_eq(row.values()[0], 3.0));
        assert!(approx_eq(row.values()[1], 4.0));
    }

    #[test]
    fn test_mean_abs_zero_window() {
        let rec = Recording::from_rows("zeros", &[vec![0.0; 4], vec![0.0; 4]]);
        assert_eq!(mean_abs(&rec.view()), SummaryRow(vec![0.0; 4]));
    }

    #[test]
    fn test_mean_abs_single_sample() {
        let rec = Recording::from_rows("one", &[vec![-0.25, 0.5, -1.5, 2.0]]);
        assert_eq!(mean_abs(&rec.view()), SummaryRow(vec![0.25, 0.5, 1.5, 2.0]));
    }

    #[test]
    fn test_reduce_all_per_window() {
        let rec = Recording::from_rows(
            "r",
            &[vec![-1.0], vec![3.0], vec![-10.0], vec![20.0]],
        );
        let windows = partition(rec.view(), rec.id(), 2).unwrap();
        let rows = reduce_all(&windows);

        assert_eq!(rows.len(), 2);
        assert!(approx_eq(rows[0].values()[0], 2.0));
        assert!(approx_eq(rows[1].values()[0], 15.0));
    }
}
