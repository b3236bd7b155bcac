//! KBM cleaning and labeling.
//!
//! Prepares raw KBM exports for the resampler: extracts the temperature tag,
//! orders rows by time, adds a per-second timestamp and an anomaly flag, and
//! marks rows that match known anomaly timestamps.

use crate::error::{ResampleError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Columns of a cleaned KBM table, in order.
pub const CLEANED_COLUMNS: [&str; 7] =
    ["time", "time_sec", "x", "y", "z", "temperature", "anomaly"];

/// Format of `time_sec` values.
const SECOND_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of anomaly timestamps as copied from the labeling spreadsheet.
const SPREADSHEET_FORMAT: &str = "%d/%m/%y %H:%M:%S";

/// Marker preceding the temperature value inside the `tags` column.
const TEMPERATURE_TAG: &str = "temperature=";

/// A comma-separated table with a header, held as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Read a table, keeping every field as text.
    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ResampleError::io(path, e))?;
        let mut lines = BufReader::new(file).lines();

        let header = match lines.next() {
            Some(line) => split_csv_line(&line.map_err(|e| ResampleError::io(path, e))?),
            None => return Err(ResampleError::malformed(path, 1, "file is empty, header expected")),
        };

        let mut rows = Vec::new();
        for (index, line) in lines.enumerate() {
            let line = line.map_err(|e| ResampleError::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_csv_line(&line);
            if fields.len() != header.len() {
                return Err(ResampleError::malformed(
                    path,
                    index + 2,
                    format!("expected {} columns, found {}", header.len(), fields.len()),
                ));
            }
            rows.push(fields);
        }

        Ok(Self { header, rows })
    }

    /// Write the table with a header row.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ResampleError::io(parent, e))?;
            }
        }

        let file = File::create(path).map_err(|e| ResampleError::io(path, e))?;
        let mut writer = BufWriter::new(file);

        write_csv_line(&mut writer, &self.header).map_err(|e| ResampleError::io(path, e))?;
        for row in &self.rows {
            write_csv_line(&mut writer, row).map_err(|e| ResampleError::io(path, e))?;
        }
        writer.flush().map_err(|e| ResampleError::io(path, e))
    }

    /// Index of a named column.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    fn require_column(&self, path: &Path, name: &str) -> Result<usize> {
        self.column(name)
            .ok_or_else(|| ResampleError::malformed(path, 1, format!("missing column '{name}'")))
    }
}

/// Clean one raw KBM export into the `time,time_sec,x,y,z,temperature,anomaly`
/// layout, sorted by time.
///
/// The temperature comes from a `temperature` column when present, otherwise
/// it is extracted from the `tags` column.
pub fn clean_kbm(input: &Path, output: &Path) -> Result<CsvTable> {
    let raw = CsvTable::read(input)?;
    let time = raw.require_column(input, "time")?;
    let axes = [
        raw.require_column(input, "x")?,
        raw.require_column(input, "y")?,
        raw.require_column(input, "z")?,
    ];
    let temperature = match raw.column("temperature") {
        Some(index) => TemperatureSource::Column(index),
        None => TemperatureSource::Tags(raw.require_column(input, "tags")?),
    };

    let mut rows = Vec::with_capacity(raw.rows.len());
    for (index, row) in raw.rows.iter().enumerate() {
        let temperature = match temperature {
            TemperatureSource::Column(column) => row[column].trim().to_string(),
            TemperatureSource::Tags(column) => extract_temperature(&row[column]).ok_or_else(|| {
                ResampleError::malformed(input, index + 2, "no temperature in tags")
            })?,
        };
        let time_value = row[time].trim().to_string();
        rows.push(vec![
            time_value.clone(),
            truncate_to_second(&time_value).to_string(),
            row[axes[0]].trim().to_string(),
            row[axes[1]].trim().to_string(),
            row[axes[2]].trim().to_string(),
            temperature,
            "0".to_string(),
        ]);
    }

    // ISO timestamps order lexicographically; the sort is stable for ties
    rows.sort_by(|a, b| a[0].cmp(&b[0]));

    let cleaned = CsvTable {
        header: CLEANED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    };
    cleaned.write(output)?;

    tracing::info!(
        "Cleaned {} rows from {} into {}",
        cleaned.rows.len(),
        input.display(),
        output.display()
    );
    Ok(cleaned)
}

#[derive(Debug, Clone, Copy)]
enum TemperatureSource {
    Column(usize),
    Tags(usize),
}

/// Pull the value following `temperature=` in a tags string, up to the next space.
pub fn extract_temperature(tags: &str) -> Option<String> {
    let (_, rest) = tags.split_once(TEMPERATURE_TAG)?;
    let value = rest.split(' ').next().unwrap_or_default().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Drop the fractional part of a timestamp (everything from the first `.`).
pub fn truncate_to_second(time: &str) -> &str {
    time.split('.').next().unwrap_or(time)
}

/// What is unusual about a step between consecutive seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Time went backwards
    Backwards,
    /// Exactly one second after the previous distinct second
    Adjacent,
}

/// A timestamp flagged by [`check_kbm`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampIssue {
    pub time_sec: String,
    pub delta_secs: i64,
    pub kind: IssueKind,
}

/// Inspect the distinct `time_sec` values of a cleaned table (in first-seen
/// order) and report steps that go backwards or are exactly one second.
pub fn check_kbm(path: &Path) -> Result<Vec<TimestampIssue>> {
    let table = CsvTable::read(path)?;
    let column = table.require_column(path, "time_sec")?;

    let mut seen = HashSet::new();
    let mut previous: Option<NaiveDateTime> = None;
    let mut issues = Vec::new();

    for (index, row) in table.rows.iter().enumerate() {
        let value = row[column].trim();
        if !seen.insert(value.to_string()) {
            continue;
        }
        let time = NaiveDateTime::parse_from_str(value, SECOND_FORMAT).map_err(|e| {
            ResampleError::malformed(path, index + 2, format!("bad time_sec '{value}': {e}"))
        })?;

        if let Some(prev) = previous {
            let delta = (time - prev).num_seconds();
            let kind = if delta < 0 {
                Some(IssueKind::Backwards)
            } else if delta == 1 {
                Some(IssueKind::Adjacent)
            } else {
                None
            };
            if let Some(kind) = kind {
                issues.push(TimestampIssue {
                    time_sec: value.to_string(),
                    delta_secs: delta,
                    kind,
                });
            }
        }
        previous = Some(time);
    }

    Ok(issues)
}

/// Convert a spreadsheet timestamp (`17/06/19 10:22:00`) to the table's
/// `2019-06-17 10:22:00` form. Runs of whitespace are tolerated.
pub fn convert_spreadsheet_timestamp(timestamp: &str) -> Option<String> {
    let normalized = timestamp.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, SPREADSHEET_FORMAT)
        .ok()
        .map(|t| t.format(SECOND_FORMAT).to_string())
}

/// Set `anomaly = 1` on every row whose `time` starts with one of the given
/// spreadsheet timestamps, and write the labeled table. Returns the number of
/// labeled rows.
pub fn label_kbm(input: &Path, output: &Path, timestamps: &[String]) -> Result<usize> {
    let mut table = CsvTable::read(input)?;
    let time = table.require_column(input, "time")?;
    let anomaly = table.require_column(input, "anomaly")?;

    let prefixes: Vec<String> = timestamps
        .iter()
        .map(|ts| {
            convert_spreadsheet_timestamp(ts).ok_or_else(|| ResampleError::MalformedRow {
                path: input.to_path_buf(),
                line: 0,
                reason: format!("anomaly timestamp '{ts}' is not in dd/mm/yy HH:MM:SS form"),
            })
        })
        .collect::<Result<_>>()?;

    let mut labeled = 0;
    for prefix in &prefixes {
        let matches = table
            .rows
            .iter()
            .filter(|row| row[time].starts_with(prefix.as_str()))
            .count();
        if matches == 0 {
            tracing::warn!("{}: anomaly timestamp {} matches no rows", input.display(), prefix);
        }
    }
    for row in &mut table.rows {
        if prefixes.iter().any(|p| row[time].starts_with(p.as_str())) {
            row[anomaly] = "1".to_string();
            labeled += 1;
        }
    }

    table.write(output)?;
    tracing::info!("Labeled {} of {} rows in {}", labeled, table.rows.len(), output.display());
    Ok(labeled)
}

/// Split a CSV line into fields, honoring double quotes (with `""` escapes).
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == ',' {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);
    fields
}

fn write_csv_line(writer: &mut impl Write, fields: &[String]) -> std::io::Result<()> {
    let line: Vec<String> = fields.iter().map(|f| quote_field(f)).collect();
    writeln!(writer, "{}", line.join(","))
}

fn quote_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
