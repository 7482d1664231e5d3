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

//! Forward-only cursor over a completed Snowflake statement.
//!
//! The first result partition arrives with the statement response; later
//! partitions are downloaded only when the rows already buffered cannot
//! fill the next batch. Cells arrive as strings and are converted to typed
//! values using the column types reported with the result.

use crate::domain::entities::{ColumnKind, QueryDescriptor, Row, RowBatch, Value};
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::snowflake::sql_api_client::{RawRows, SqlApiClient};
use crate::ports::batch_source::RowBatchSource;
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::Arc;

pub struct SnowflakeCursor {
    api: Arc<SqlApiClient>,
    handle: String,
    descriptor: QueryDescriptor,
    buffered: VecDeque<Vec<Option<String>>>,
    next_partition: usize,
    partitions: usize,
    exhausted: bool,
}

impl SnowflakeCursor {
    pub fn new(
        api: Arc<SqlApiClient>,
        handle: String,
        descriptor: QueryDescriptor,
        first_partition: RawRows,
        partitions: usize,
    ) -> Self {
        Self {
            api,
            handle,
            descriptor,
            buffered: first_partition.into(),
            next_partition: 1,
            partitions: partitions.max(1),
            exhausted: false,
        }
    }

    fn convert(&self, raw: Vec<Option<String>>) -> Result<Row> {
        let columns = self.descriptor.columns();
        raw.into_iter()
            .enumerate()
            .map(|(i, cell)| {
                let kind = columns.get(i).and_then(|c| c.kind).unwrap_or(ColumnKind::Utf8);
                parse_cell(kind, cell).map_err(|msg| {
                    let name = columns.get(i).map(|c| c.name.as_str()).unwrap_or("?");
                    ExportError::SourceError(format!("column {}: {}", name, msg))
                })
            })
            .collect()
    }
}

impl RowBatchSource for SnowflakeCursor {
    fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    fn next_batch(&mut self, chunk_size: usize) -> Result<RowBatch> {
        let chunk_size = chunk_size.max(1);
        while self.buffered.len() < chunk_size && self.next_partition < self.partitions {
            let rows = self.api.partition(&self.handle, self.next_partition)?;
            debug!(
                "Fetched partition {}/{} ({} rows)",
                self.next_partition + 1,
                self.partitions,
                rows.len()
            );
            self.buffered.extend(rows);
            self.next_partition += 1;
        }

        let take = chunk_size.min(self.buffered.len());
        if take == 0 {
            self.exhausted = true;
            return Ok(Vec::new());
        }
        let raw: Vec<_> = self.buffered.drain(..take).collect();
        raw.into_iter().map(|r| self.convert(r)).collect()
    }
}

impl Drop for SnowflakeCursor {
    fn drop(&mut self) {
        if self.exhausted || self.next_partition >= self.partitions {
            return;
        }
        debug!("Cancelling unfinished statement {}", self.handle);
        if let Err(e) = self.api.cancel(&self.handle) {
            warn!("Could not cancel statement {}: {}", self.handle, e);
        }
    }
}

/// Converts one cell from its API string form.
///
/// Dates are days since the epoch and times are `seconds.fraction` since
/// midnight. Timestamps are `seconds.fraction` since the epoch, UTC; a
/// `TIMESTAMP_TZ` cell carries a second field holding its offset in minutes
/// plus 1440. Decimals are read digit for digit into the column's scale.
pub fn parse_cell(kind: ColumnKind, cell: Option<String>) -> std::result::Result<Value, String> {
    let text = match cell {
        None => return Ok(Value::Null),
        Some(t) => t,
    };

    match kind {
        ColumnKind::Utf8 => Ok(Value::Text(text)),
        ColumnKind::Int64 => text
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| unreadable(&text, "an integer")),
        ColumnKind::Float64 => text
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| unreadable(&text, "a float")),
        ColumnKind::Decimal { scale, .. } => parse_unscaled(&text, scale)
            .map(|unscaled| Value::Decimal { unscaled, scale })
            .ok_or_else(|| unreadable(&text, "a decimal")),
        ColumnKind::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(unreadable(&text, "a boolean")),
        },
        ColumnKind::Date => text
            .parse::<i32>()
            .map(Value::Date)
            .map_err(|_| unreadable(&text, "a date")),
        ColumnKind::Time => parse_epoch_micros(&text)
            .filter(|us| (0..86_400_000_000).contains(us))
            .map(Value::Time)
            .ok_or_else(|| unreadable(&text, "a time")),
        ColumnKind::Timestamp => parse_epoch_micros(&text)
            .map(Value::Timestamp)
            .ok_or_else(|| unreadable(&text, "a timestamp")),
        ColumnKind::TimestampTz => parse_offset_timestamp(&text)
            .ok_or_else(|| unreadable(&text, "a timestamp with offset")),
    }
}

fn unreadable(text: &str, what: &str) -> String {
    format!("cannot read '{}' as {}", text, what)
}

/// `"12.5"` at scale 2 -> `1250`. Extra fractional digits are accepted only
/// when they are zeros, nothing is rounded.
fn parse_unscaled(text: &str, scale: i8) -> Option<i128> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int.is_empty() && frac.is_empty()) || !all_digits(int) || !all_digits(frac) {
        return None;
    }

    let scale = usize::try_from(scale).ok()?;
    let (kept, dropped) = frac.split_at(frac.len().min(scale));
    if dropped.bytes().any(|b| b != b'0') {
        return None;
    }
    let digits = format!("{}{:0<width$}", int, kept, width = scale);
    let magnitude: i128 = if digits.is_empty() { 0 } else { digits.parse().ok()? };
    Some(if negative { -magnitude } else { magnitude })
}

/// `"1698417045.123456789"` -> microseconds since the epoch.
fn parse_epoch_micros(text: &str) -> Option<i64> {
    let epoch = text.split_whitespace().next()?;
    let (negative, unsigned) = match epoch.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, epoch),
    };
    let (secs, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if secs.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let secs: i64 = secs.parse().ok()?;
    let micros: i64 = format!("{:0<6}", &frac[..frac.len().min(6)]).parse().ok()?;
    let total = secs.checked_mul(1_000_000)?.checked_add(micros)?;
    Some(if negative { -total } else { total })
}

/// `"1698417045.5 1020"` -> the UTC instant recorded at offset -07:00.
/// `TIMESTAMP_LTZ` cells have no offset field and are kept at UTC.
fn parse_offset_timestamp(text: &str) -> Option<Value> {
    let micros = parse_epoch_micros(text)?;
    let offset_minutes = match text.split_whitespace().nth(1) {
        Some(encoded) => encoded.parse::<i32>().ok()? - 1440,
        None => 0,
    };
    if offset_minutes.abs() >= 1440 {
        return None;
    }
    Some(Value::TimestampTz {
        micros,
        offset_minutes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse_cell(ColumnKind::Int64, Some("42".into())), Ok(Value::Int(42)));
        assert_eq!(parse_cell(ColumnKind::Float64, Some("1.25".into())), Ok(Value::Float(1.25)));
        assert_eq!(parse_cell(ColumnKind::Boolean, Some("TRUE".into())), Ok(Value::Bool(true)));
        assert_eq!(parse_cell(ColumnKind::Utf8, Some("a,b".into())), Ok(Value::Text("a,b".into())));
        assert_eq!(parse_cell(ColumnKind::Date, Some("19657".into())), Ok(Value::Date(19_657)));
        assert_eq!(
            parse_cell(ColumnKind::Time, Some("45045.000000000".into())),
            Ok(Value::Time(45_045_000_000))
        );
        assert_eq!(parse_cell(ColumnKind::Int64, None), Ok(Value::Null));
        assert!(parse_cell(ColumnKind::Int64, Some("12x".into())).is_err());
    }

    #[test]
    fn test_decimals_keep_every_digit() {
        let decimal = |precision, scale, text: &str| {
            parse_cell(ColumnKind::Decimal { precision, scale }, Some(text.to_string()))
        };
        assert_eq!(
            decimal(19, 2, "12345678901234567.89"),
            Ok(Value::Decimal {
                unscaled: 1_234_567_890_123_456_789,
                scale: 2
            })
        );
        assert_eq!(decimal(10, 2, "1.50"), Ok(Value::Decimal { unscaled: 150, scale: 2 }));
        assert_eq!(decimal(10, 2, "-.5"), Ok(Value::Decimal { unscaled: -50, scale: 2 }));
        assert_eq!(decimal(10, 2, "3.100"), Ok(Value::Decimal { unscaled: 310, scale: 2 }));
        assert_eq!(
            decimal(38, 0, "99999999999999999999"),
            Ok(Value::Decimal {
                unscaled: 99_999_999_999_999_999_999,
                scale: 0
            })
        );
        assert!(decimal(10, 2, "1.005").is_err());
        assert!(decimal(10, 2, "1e5").is_err());
        assert!(decimal(10, 2, "-").is_err());
    }

    #[test]
    fn test_parse_timestamps() {
        assert_eq!(
            parse_cell(ColumnKind::Timestamp, Some("1698417045.123456789".into())),
            Ok(Value::Timestamp(1_698_417_045_123_456))
        );
        assert_eq!(parse_epoch_micros("-1.5"), Some(-1_500_000));
        assert_eq!(parse_epoch_micros("0"), Some(0));
        assert_eq!(parse_epoch_micros("abc"), None);
    }

    #[test]
    fn test_offset_timestamps_keep_their_offset() {
        assert_eq!(
            parse_cell(ColumnKind::TimestampTz, Some("1698417045.5 1020".into())),
            Ok(Value::TimestampTz {
                micros: 1_698_417_045_500_000,
                offset_minutes: -420
            })
        );
        assert_eq!(
            parse_cell(ColumnKind::TimestampTz, Some("1698417045.5".into())),
            Ok(Value::TimestampTz {
                micros: 1_698_417_045_500_000,
                offset_minutes: 0
            })
        );
        assert!(parse_cell(ColumnKind::TimestampTz, Some("1698417045 3000".into())).is_err());
    }
}
