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

//! # Type Mapping Logic
//!
//! This module is the "Translator". Snowflake, our row model and Arrow each
//! have their own idea of a column type. Every warehouse type is mapped to a
//! `ColumnKind`, and every `ColumnKind` to the Arrow `DataType` the Parquet
//! writer stores.

use crate::domain::entities::{ColumnKind, MAX_DECIMAL_PRECISION};
use arrow_schema::{DataType, TimeUnit};

/// Zone name stored on Arrow timestamps that carry an offset; values are UTC instants.
pub const UTC_ZONE: &str = "+00:00";

/// Returns the `ColumnKind` for a Snowflake SQL API `rowType` entry.
///
/// `sf_type` is the type name the API reports (`fixed`, `real`, `text`,
/// `timestamp_ntz`, ...). A `NUMBER` that always fits an `i64` (scale 0,
/// precision up to 18) is an integer; every other `NUMBER` is an exact
/// decimal, so `NUMBER(38, 0)` keys and money columns keep all their digits.
/// Semi-structured and binary types stay text.
pub fn map_snowflake_type(sf_type: &str, precision: Option<u32>, scale: Option<u32>) -> ColumnKind {
    match sf_type.to_lowercase().as_str() {
        "fixed" => map_number(precision, scale),
        "real" | "float" | "double" => ColumnKind::Float64,
        "boolean" => ColumnKind::Boolean,
        "date" => ColumnKind::Date,
        "time" => ColumnKind::Time,
        "timestamp_ntz" => ColumnKind::Timestamp,
        "timestamp_ltz" | "timestamp_tz" => ColumnKind::TimestampTz,
        _ => ColumnKind::Utf8,
    }
}

fn map_number(precision: Option<u32>, scale: Option<u32>) -> ColumnKind {
    let precision = precision
        .and_then(|p| u8::try_from(p).ok())
        .filter(|p| (1..=MAX_DECIMAL_PRECISION).contains(p))
        .unwrap_or(MAX_DECIMAL_PRECISION);
    let scale = scale
        .and_then(|s| i8::try_from(s).ok())
        .unwrap_or(0)
        .min(precision as i8);
    if scale == 0 && precision <= 18 {
        ColumnKind::Int64
    } else {
        ColumnKind::Decimal { precision, scale }
    }
}

/// Returns the Arrow DataType for Parquet export.
pub fn map_kind_to_arrow(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Boolean => DataType::Boolean,
        ColumnKind::Int64 => DataType::Int64,
        ColumnKind::Float64 => DataType::Float64,
        ColumnKind::Decimal { precision, scale } => DataType::Decimal128(precision, scale),
        ColumnKind::Utf8 => DataType::Utf8,
        ColumnKind::Date => DataType::Date32,
        ColumnKind::Time => DataType::Time64(TimeUnit::Microsecond),
        ColumnKind::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        ColumnKind::TimestampTz => {
            DataType::Timestamp(TimeUnit::Microsecond, Some(UTC_ZONE.into()))
        }
    }
}

/// Reverse of `map_kind_to_arrow`. `None` for the `Null` type of all-null columns.
pub fn map_arrow_to_kind(dt: &DataType) -> Option<ColumnKind> {
    match dt {
        DataType::Boolean => Some(ColumnKind::Boolean),
        DataType::Int64 => Some(ColumnKind::Int64),
        DataType::Float64 => Some(ColumnKind::Float64),
        DataType::Decimal128(precision, scale) => Some(ColumnKind::Decimal {
            precision: *precision,
            scale: *scale,
        }),
        DataType::Utf8 => Some(ColumnKind::Utf8),
        DataType::Date32 => Some(ColumnKind::Date),
        DataType::Time64(TimeUnit::Microsecond) => Some(ColumnKind::Time),
        DataType::Timestamp(TimeUnit::Microsecond, None) => Some(ColumnKind::Timestamp),
        DataType::Timestamp(TimeUnit::Microsecond, Some(_)) => Some(ColumnKind::TimestampTz),
        _ => None,
    }
}
