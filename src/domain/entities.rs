// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Domain Entities
//!
//! Entities are the "Nouns" of the exporter: the column list of a query, the
//! rows flowing through the pipeline, the file that comes out the other end,
//! and the remote places that file can be delivered to.

use crate::domain::errors::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// `FileFormat` defines how we save the data on disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileFormat {
    /// Comma-separated values (CSV), gzip compressed when the path ends in `.gz`.
    Csv,
    /// Apache Parquet: a single columnar file with an embedded schema.
    Parquet,
}

impl FileFormat {
    /// Picks the format implied by an output path (`.parquet` / `.pq` means Parquet).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") || ext.eq_ignore_ascii_case("pq") => {
                FileFormat::Parquet
            }
            _ => FileFormat::Csv,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "CSV"),
            FileFormat::Parquet => write!(f, "PARQUET"),
        }
    }
}

/// Logical type of a column, either declared by the warehouse or inferred from values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnKind {
    Boolean,
    Int64,
    Float64,
    /// Exact fixed-point number, stored as an unscaled 128-bit integer.
    Decimal { precision: u8, scale: i8 },
    Utf8,
    /// Days since the Unix epoch.
    Date,
    /// Microseconds since midnight.
    Time,
    /// Microseconds since the Unix epoch, no time zone.
    Timestamp,
    /// Microseconds since the Unix epoch for an instant with a UTC offset.
    TimestampTz,
}

/// Widest decimal an unscaled `i128` holds.
pub const MAX_DECIMAL_PRECISION: u8 = 38;

/// A single cell of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// `unscaled / 10^scale`
    Decimal { unscaled: i128, scale: i8 },
    Text(String),
    Date(i32),
    Time(i64),
    Timestamp(i64),
    /// UTC microseconds plus the offset, in minutes, the value was recorded with.
    TimestampTz { micros: i64, offset_minutes: i32 },
}

impl Value {
    /// The kind this value belongs to; `None` for nulls, which fit every kind.
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnKind::Boolean),
            Value::Int(_) => Some(ColumnKind::Int64),
            Value::Float(_) => Some(ColumnKind::Float64),
            Value::Decimal { scale, .. } => Some(ColumnKind::Decimal {
                precision: MAX_DECIMAL_PRECISION,
                scale: *scale,
            }),
            Value::Text(_) => Some(ColumnKind::Utf8),
            Value::Date(_) => Some(ColumnKind::Date),
            Value::Time(_) => Some(ColumnKind::Time),
            Value::Timestamp(_) => Some(ColumnKind::Timestamp),
            Value::TimestampTz { .. } => Some(ColumnKind::TimestampTz),
        }
    }
}

/// Text form used by the delimited writer. Nulls render as an empty field.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Decimal { unscaled, scale } => f.write_str(&format_decimal(*unscaled, *scale)),
            Value::Text(s) => f.write_str(s),
            Value::Date(days) => {
                match chrono::NaiveDate::from_num_days_from_ce_opt(days + 719_163) {
                    Some(d) => write!(f, "{}", d.format("%Y-%m-%d")),
                    None => write!(f, "{}", days),
                }
            }
            Value::Time(us) => {
                let secs = us.div_euclid(1_000_000);
                let nanos = us.rem_euclid(1_000_000) * 1_000;
                match u32::try_from(secs).ok().and_then(|s| {
                    chrono::NaiveTime::from_num_seconds_from_midnight_opt(s, nanos as u32)
                }) {
                    Some(t) => write!(f, "{}", t.format("%H:%M:%S%.6f")),
                    None => write!(f, "{}", us),
                }
            }
            Value::Timestamp(us) => {
                match chrono::DateTime::<chrono::Utc>::from_timestamp_micros(*us) {
                    Some(ts) => write!(f, "{}", ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f")),
                    None => write!(f, "{}", us),
                }
            }
            Value::TimestampTz {
                micros,
                offset_minutes,
            } => {
                let local = chrono::FixedOffset::east_opt(offset_minutes * 60).and_then(|tz| {
                    chrono::DateTime::<chrono::Utc>::from_timestamp_micros(*micros)
                        .map(|ts| ts.with_timezone(&tz))
                });
                match local {
                    Some(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.6f%:z")),
                    None => write!(f, "{}", micros),
                }
            }
        }
    }
}

/// Renders an unscaled decimal with exactly `scale` fractional digits.
fn format_decimal(unscaled: i128, scale: i8) -> String {
    let digits = unscaled.unsigned_abs().to_string();
    let sign = if unscaled < 0 { "-" } else { "" };
    if scale <= 0 {
        return format!("{}{}", sign, digits);
    }
    let scale = scale as usize;
    let padded = format!("{:0>width$}", digits, width = scale + 1);
    let (int, frac) = padded.split_at(padded.len() - scale);
    format!("{}{}.{}", sign, int, frac)
}

/// One column of the query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Type reported by the warehouse, if it reported one.
    pub kind: Option<ColumnKind>,
}

/// `QueryDescriptor` is the ordered column list of an executed query.
///
/// It is captured exactly once, before any row is read, and never changes
/// for the lifetime of an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    columns: Vec<Column>,
}

impl QueryDescriptor {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// A descriptor with names only; types are left to inference.
    #[cfg(test)]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: names
                .into_iter()
                .map(|n| Column {
                    name: n.into(),
                    kind: None,
                })
                .collect(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A result row, in descriptor column order.
pub type Row = Vec<Value>;

/// A bounded, ordered slice of query results pulled in one fetch.
pub type RowBatch = Vec<Row>;

/// `ExportArtifact` is a finished, closed output file ready for publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub path: PathBuf,
    /// Size on disk at the time the artifact was stat'ed.
    pub bytes: u64,
}

impl ExportArtifact {
    /// Stats a closed file on disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let bytes = std::fs::metadata(&path)?.len();
        Ok(Self { path, bytes })
    }
}

/// Where the contents API writes the artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitTarget {
    /// `owner/repo`
    pub repo: String,
    pub branch: String,
    /// Path of the file inside the repository.
    pub path: String,
    pub message: String,
}

/// Which release the artifact is attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseTarget {
    /// `owner/repo`
    pub repo: String,
    pub tag: String,
    /// Human readable release name used when the release has to be created.
    pub name: Option<String>,
    pub asset_name: String,
}

/// Which of the two remote write statuses a commit produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    Created,
    Updated,
}

/// The outcome of a successful publication.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishReceipt {
    Committed {
        status: CommitStatus,
        repo: String,
        branch: String,
        path: String,
    },
    Released {
        tag: String,
        asset_name: String,
        release_created: bool,
        replaced_existing: bool,
    },
}

impl fmt::Display for PublishReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishReceipt::Committed {
                status,
                repo,
                branch,
                path,
            } => {
                let verb = match status {
                    CommitStatus::Created => "Created",
                    CommitStatus::Updated => "Updated",
                };
                write!(f, "{} {}@{}:{}", verb, repo, branch, path)
            }
            PublishReceipt::Released {
                tag,
                asset_name,
                replaced_existing,
                ..
            } => {
                let verb = if *replaced_existing { "Replaced" } else { "Uploaded" };
                write!(f, "{} asset {} on release {}", verb, asset_name, tag)
            }
        }
    }
}

/// `ExportReport` is the "Report Card" for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub format: FileFormat,
    pub rows: u64,
    pub bytes: u64,
    /// Wall-clock seconds from query execution to closed file.
    pub duration: f64,
}
