//! Recording loading.
//!
//! A recording is an ordered, fixed-width numeric table. Row order is the
//! sampling order; no per-sample timestamp is carried.

use crate::core::windowing::Window;
use crate::error::{ResampleError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

/// The two supported dataset layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Directory of headerless, tab-separated files, one recording each.
    Bearing,
    /// One continuous comma-separated base-rate table with a header.
    Kbm,
}

impl DatasetKind {
    /// Infer the dataset layout from its path: anything mentioning "kbm" is KBM.
    pub fn from_path(path: &Path) -> Self {
        if path.to_string_lossy().contains("kbm") {
            DatasetKind::Kbm
        } else {
            DatasetKind::Bearing
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Bearing => "bearing",
            DatasetKind::Kbm => "kbm",
        }
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bearing" => Ok(DatasetKind::Bearing),
            "kbm" => Ok(DatasetKind::Kbm),
            other => Err(format!("unknown dataset '{other}' (expected bearing or kbm)")),
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered numeric table held row-major in one buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    id: String,
    channels: usize,
    samples: Vec<f64>,
}

impl Recording {
    /// Build a recording from a row-major sample buffer.
    ///
    /// A trailing partial row (buffer length not a multiple of `channels`) is
    /// not representable and is cut off.
    pub fn new(id: impl Into<String>, channels: usize, mut samples: Vec<f64>) -> Self {
        let channels = channels.max(1);
        samples.truncate(samples.len() - samples.len() % channels);
        Self {
            id: id.into(),
            channels,
            samples,
        }
    }

    /// Build a recording from explicit rows. Rows must all have the same width.
    pub fn from_rows(id: impl Into<String>, rows: &[Vec<f64>]) -> Self {
        let channels = rows.first().map(Vec::len).unwrap_or(1);
        let samples = rows.iter().flatten().copied().collect();
        Self::new(id, channels, samples)
    }

    /// Identifier used in logs and errors (usually the file name).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of samples (rows).
    pub fn len(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get one sample as a slice of channel values.
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        let start = index.checked_mul(self.channels)?;
        self.samples.get(start..start + self.channels)
    }

    /// View the whole recording as a single window.
    pub fn view(&self) -> Window<'_> {
        Window::new(0, self.channels, &self.samples)
    }
}

/// Load one bearing recording: headerless, tab-separated, `channels` columns.
pub fn load_bearing(path: &Path, channels: usize) -> Result<Recording> {
    let reader = open(path)?;
    let mut samples = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| ResampleError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() != channels {
            return Err(ResampleError::malformed(
                path,
                line_no,
                format!("expected {channels} columns, found {}", fields.len()),
            ));
        }
        for field in fields {
            samples.push(parse_value(path, line_no, field)?);
        }
    }

    Ok(Recording::new(recording_id(path), channels, samples))
}

/// Load the full KBM base-rate table: comma-separated with a header row.
///
/// With `columns` set, only the named columns are kept (in the given order);
/// otherwise every column is used. The resulting width must equal
/// `num_features`.
pub fn load_kbm(path: &Path, num_features: usize, columns: Option<&[String]>) -> Result<Recording> {
    let reader = open(path)?;
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line.map_err(|e| ResampleError::io(path, e))?,
        None => return Err(ResampleError::malformed(path, 1, "file is empty, header expected")),
    };
    let header: Vec<String> = header
        .split(',')
        .map(|name| name.trim().trim_matches('"').to_string())
        .collect();

    let selected: Vec<usize> = match columns {
        Some(names) => names
            .iter()
            .map(|name| {
                header.iter().position(|h| h == name).ok_or_else(|| {
                    ResampleError::malformed(path, 1, format!("column '{name}' not in header"))
                })
            })
            .collect::<Result<_>>()?,
        None => (0..header.len()).collect(),
    };

    if selected.len() != num_features {
        return Err(ResampleError::malformed(
            path,
            1,
            format!(
                "{} columns selected, {num_features} features expected",
                selected.len()
            ),
        ));
    }

    let mut samples = Vec::new();
    for (index, line) in lines.enumerate() {
        let line = line.map_err(|e| ResampleError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        // header is line 1
        let line_no = index + 2;
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != header.len() {
            return Err(ResampleError::malformed(
                path,
                line_no,
                format!("expected {} columns, found {}", header.len(), fields.len()),
            ));
        }
        for &column in &selected {
            samples.push(parse_value(path, line_no, fields[column])?);
        }
    }

    Ok(Recording::new(recording_id(path), num_features, samples))
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| ResampleError::io(path, e))
}

fn parse_value(path: &Path, line: usize, field: &str) -> Result<f64> {
    let trimmed = field.trim();
    let value = trimmed
        .parse::<f64>()
        .map_err(|_| ResampleError::malformed(path, line, format!("'{trimmed}' is not a number")))?;
    // NaN and infinities parse, but would poison every mean they feed
    if !value.is_finite() {
        return Err(ResampleError::malformed(
            path,
            line,
            format!("'{trimmed}' is not a finite number"),
        ));
    }
    Ok(value)
}

fn recording_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_dataset_kind_from_path() {
        assert_eq!(
            DatasetKind::from_path(Path::new("data/kbm_dataset/pumpe_v3")),
            DatasetKind::Kbm
        );
        assert_eq!(
            DatasetKind::from_path(Path::new("data/bearing/1st_test")),
            DatasetKind::Bearing
        );
        assert_eq!("KBM".parse::<DatasetKind>(), Ok(DatasetKind::Kbm));
        assert!("audio".parse::<DatasetKind>().is_err());
    }

    #[test]
    fn test_recording_rows() {
        let rec = Recording::from_rows("r", &[vec![1.0, -2.0], vec![3.0, 4.0]]);
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.channels(), 2);
        assert_eq!(rec.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(rec.row(2), None);
    }

    #[test]
    fn test_load_bearing() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "-0.022\t-0.039\t-0.183\t-0.054").unwrap();
        writeln!(file, "-0.105\t-0.017\t-0.164\t-0.183").unwrap();

        let rec = load_bearing(file.path(), 4).unwrap();
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.row(0), Some(&[-0.022, -0.039, -0.183, -0.054][..]));
    }

    #[test]
    fn test_load_bearing_wrong_width() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1\t2\t3\t4").unwrap();
        writeln!(file, "1\t2\t3").unwrap();

        let err = load_bearing(file.path(), 4).unwrap_err();
        assert!(matches!(err, ResampleError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn test_load_bearing_non_numeric() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1\t2\tabc\t4").unwrap();

        let err = load_bearing(file.path(), 4).unwrap_err();
        assert!(matches!(err, ResampleError::MalformedRow { line: 1, .. }));
    }

    #[test]
    fn test_load_bearing_rejects_nan_and_inf() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1\t2\t3\t4").unwrap();
        writeln!(file, "NaN\t2\tinf\t4").unwrap();

        let err = load_bearing(file.path(), 4).unwrap_err();
        match err {
            ResampleError::MalformedRow { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("finite"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_kbm_rejects_infinity() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "x,y").unwrap();
        writeln!(file, "0.1,0.2").unwrap();
        writeln!(file, "-infinity,0.2").unwrap();

        let err = load_kbm(file.path(), 2, None).unwrap_err();
        assert!(matches!(err, ResampleError::MalformedRow { line: 3, .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_bearing(Path::new("/nonexistent/recording.txt"), 4).unwrap_err();
        assert!(matches!(err, ResampleError::MissingFile { .. }));
    }

    #[test]
    fn test_load_kbm_all_columns() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "x,y,z,temperature,anomaly").unwrap();
        writeln!(file, "0.1,-0.2,0.3,21.5,0").unwrap();
        writeln!(file, "0.4,0.5,-0.6,21.5,1").unwrap();

        let rec = load_kbm(file.path(), 5, None).unwrap();
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.row(1), Some(&[0.4, 0.5, -0.6, 21.5, 1.0][..]));
    }

    #[test]
    fn test_load_kbm_column_selection() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "time,x,y,z").unwrap();
        writeln!(file, "2019-06-17 10:22:00.1,1,2,3").unwrap();

        let columns = vec!["z".to_string(), "x".to_string()];
        let rec = load_kbm(file.path(), 2, Some(&columns)).unwrap();
        assert_eq!(rec.row(0), Some(&[3.0, 1.0][..]));

        let missing = vec!["w".to_string()];
        assert!(load_kbm(file.path(), 1, Some(&missing)).is_err());
    }

    #[test]
    fn test_load_kbm_feature_mismatch() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "x,y,z").unwrap();
        writeln!(file, "1,2,3").unwrap();

        let err = load_kbm(file.path(), 5, None).unwrap_err();
        assert!(matches!(err, ResampleError::MalformedRow { line: 1, .. }));
    }
}
