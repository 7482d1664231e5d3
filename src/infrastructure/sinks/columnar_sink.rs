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

//! Columnar sink: every batch becomes an Arrow `RecordBatch` appended to one
//! Parquet file.
//!
//! The writer is opened on the first non-empty batch so the file schema
//! comes from real data. Declared warehouse types win; otherwise a column
//! takes the type of its first non-null value in that batch, and an
//! all-null column is stored as `Null`. Later batches must fit the schema
//! exactly, nothing is coerced.

use crate::domain::entities::{ColumnKind, ExportArtifact, QueryDescriptor, RowBatch, Value};
use crate::domain::errors::{ExportError, Result};
use crate::domain::mapping::{map_arrow_to_kind, map_kind_to_arrow};
use crate::ports::sink_writer::SinkWriter;
use arrow_array::builder::{
    BooleanBuilder, Date32Builder, Decimal128Builder, Float64Builder, Int64Builder,
    StringBuilder, Time64MicrosecondBuilder, TimestampMicrosecondBuilder,
};
use arrow_array::{ArrayRef, NullArray, RecordBatch, RecordBatchOptions};
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use log::{debug, info};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression as ParquetCompression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Helper enum to manage the different Arrow array builders of a batch.
enum ColumnBuilder {
    Null(usize),
    Boolean(BooleanBuilder),
    Int64(Int64Builder),
    Float64(Float64Builder),
    Decimal(Decimal128Builder, i8),
    String(StringBuilder),
    Date(Date32Builder),
    Time(Time64MicrosecondBuilder),
    Timestamp(TimestampMicrosecondBuilder),
    TimestampTz(TimestampMicrosecondBuilder),
}

impl ColumnBuilder {
    fn new(dt: &DataType, capacity: usize) -> Result<Self> {
        Ok(match dt {
            DataType::Boolean => ColumnBuilder::Boolean(BooleanBuilder::with_capacity(capacity)),
            DataType::Int64 => ColumnBuilder::Int64(Int64Builder::with_capacity(capacity)),
            DataType::Float64 => ColumnBuilder::Float64(Float64Builder::with_capacity(capacity)),
            DataType::Decimal128(p, s) => ColumnBuilder::Decimal(
                Decimal128Builder::with_capacity(capacity).with_precision_and_scale(*p, *s)?,
                *s,
            ),
            DataType::Date32 => ColumnBuilder::Date(Date32Builder::with_capacity(capacity)),
            DataType::Time64(TimeUnit::Microsecond) => {
                ColumnBuilder::Time(Time64MicrosecondBuilder::with_capacity(capacity))
            }
            DataType::Timestamp(TimeUnit::Microsecond, None) => {
                ColumnBuilder::Timestamp(TimestampMicrosecondBuilder::with_capacity(capacity))
            }
            DataType::Timestamp(TimeUnit::Microsecond, Some(tz)) => ColumnBuilder::TimestampTz(
                TimestampMicrosecondBuilder::with_capacity(capacity).with_timezone(tz.clone()),
            ),
            DataType::Utf8 => {
                ColumnBuilder::String(StringBuilder::with_capacity(capacity, capacity * 20))
            }
            _ => ColumnBuilder::Null(0),
        })
    }

    /// Appends one value. Returns `false` when the value does not fit the column type.
    fn push(&mut self, value: &Value) -> bool {
        match (self, value) {
            (ColumnBuilder::Null(n), Value::Null) => *n += 1,
            (ColumnBuilder::Null(_), _) => return false,
            (ColumnBuilder::Boolean(b), Value::Null) => b.append_null(),
            (ColumnBuilder::Boolean(b), Value::Bool(v)) => b.append_value(*v),
            (ColumnBuilder::Int64(b), Value::Null) => b.append_null(),
            (ColumnBuilder::Int64(b), Value::Int(v)) => b.append_value(*v),
            (ColumnBuilder::Float64(b), Value::Null) => b.append_null(),
            (ColumnBuilder::Float64(b), Value::Float(v)) => b.append_value(*v),
            (ColumnBuilder::Decimal(b, _), Value::Null) => b.append_null(),
            (ColumnBuilder::Decimal(b, s), Value::Decimal { unscaled, scale }) if *s == *scale => {
                b.append_value(*unscaled)
            }
            (ColumnBuilder::String(b), Value::Null) => b.append_null(),
            (ColumnBuilder::String(b), Value::Text(v)) => b.append_value(v),
            (ColumnBuilder::Date(b), Value::Null) => b.append_null(),
            (ColumnBuilder::Date(b), Value::Date(v)) => b.append_value(*v),
            (ColumnBuilder::Time(b), Value::Null) => b.append_null(),
            (ColumnBuilder::Time(b), Value::Time(v)) => b.append_value(*v),
            (ColumnBuilder::Timestamp(b), Value::Null) => b.append_null(),
            (ColumnBuilder::Timestamp(b), Value::Timestamp(v)) => b.append_value(*v),
            (ColumnBuilder::TimestampTz(b), Value::Null) => b.append_null(),
            (ColumnBuilder::TimestampTz(b), Value::TimestampTz { micros, .. }) => {
                b.append_value(*micros)
            }
            _ => return false,
        }
        true
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            ColumnBuilder::Null(n) => Arc::new(NullArray::new(*n)) as ArrayRef,
            ColumnBuilder::Boolean(b) => Arc::new(b.finish()) as ArrayRef,
            ColumnBuilder::Int64(b) => Arc::new(b.finish()) as ArrayRef,
            ColumnBuilder::Float64(b) => Arc::new(b.finish()) as ArrayRef,
            ColumnBuilder::Decimal(b, _) => Arc::new(b.finish()) as ArrayRef,
            ColumnBuilder::String(b) => Arc::new(b.finish()) as ArrayRef,
            ColumnBuilder::Date(b) => Arc::new(b.finish()) as ArrayRef,
            ColumnBuilder::Time(b) => Arc::new(b.finish()) as ArrayRef,
            ColumnBuilder::Timestamp(b) | ColumnBuilder::TimestampTz(b) => {
                Arc::new(b.finish()) as ArrayRef
            }
        }
    }
}

fn kind_name(kind: Option<ColumnKind>) -> String {
    kind.map(|k| format!("{:?}", k))
        .unwrap_or_else(|| "Null".to_string())
}

/// Streams batches into a single Parquet file.
pub struct ColumnarSink {
    path: PathBuf,
    descriptor: QueryDescriptor,
    compression: ParquetCompression,
    schema: Option<SchemaRef>,
    writer: Option<ArrowWriter<File>>,
    rows: u64,
}

impl ColumnarSink {
    /// Prepares a sink for `path`. No file is created until data arrives or `finalize` runs.
    pub fn new(path: &Path, descriptor: &QueryDescriptor, compression: ParquetCompression) -> Self {
        Self {
            path: path.to_path_buf(),
            descriptor: descriptor.clone(),
            compression,
            schema: None,
            writer: None,
            rows: 0,
        }
    }

    /// Maps a compression string to the corresponding Parquet compression codec.
    pub fn map_parquet_compression(c: Option<&str>) -> ParquetCompression {
        match c.unwrap_or("snappy").to_lowercase().as_str() {
            "gzip" => ParquetCompression::GZIP(Default::default()),
            "brotli" => ParquetCompression::BROTLI(Default::default()),
            "lz4" => ParquetCompression::LZ4,
            "zstd" => ParquetCompression::ZSTD(Default::default()),
            "none" => ParquetCompression::UNCOMPRESSED,
            _ => ParquetCompression::SNAPPY,
        }
    }

    /// Schema for the file, from declared types first and the batch values second.
    fn derive_schema(&self, batch: &RowBatch) -> SchemaRef {
        let fields: Vec<Field> = self
            .descriptor
            .columns()
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let kind = col
                    .kind
                    .or_else(|| batch.iter().find_map(|row| row.get(i).and_then(Value::kind)));
                let dt = kind.map(map_kind_to_arrow).unwrap_or(DataType::Null);
                Field::new(&col.name, dt, true)
            })
            .collect();
        Arc::new(Schema::new(fields))
    }

    /// Schema of a zero-row export: every column present, every column `Null`.
    fn null_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .descriptor
            .columns()
            .iter()
            .map(|col| Field::new(&col.name, DataType::Null, true))
            .collect();
        Arc::new(Schema::new(fields))
    }

    fn open_writer(&self, schema: SchemaRef) -> Result<ArrowWriter<File>> {
        let file = File::create(&self.path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .build();
        Ok(ArrowWriter::try_new(file, schema, Some(props))?)
    }

    fn to_record_batch(schema: &SchemaRef, batch: &RowBatch) -> Result<RecordBatch> {
        let mut builders = schema
            .fields()
            .iter()
            .map(|f| ColumnBuilder::new(f.data_type(), batch.len()))
            .collect::<Result<Vec<_>>>()?;

        for row in batch {
            for (i, builder) in builders.iter_mut().enumerate() {
                let value = &row[i];
                if !builder.push(value) {
                    let field = schema.field(i);
                    return Err(ExportError::SchemaConsistencyError {
                        column: field.name().clone(),
                        expected: kind_name(map_arrow_to_kind(field.data_type())),
                        found: kind_name(value.kind()),
                    });
                }
            }
        }

        let arrays: Vec<ArrayRef> = builders.iter_mut().map(|b| b.finish()).collect();
        let options = RecordBatchOptions::new().with_row_count(Some(batch.len()));
        Ok(RecordBatch::try_new_with_options(schema.clone(), arrays, &options)?)
    }

    /// Kind of each column in the file schema, `None` for `Null` columns.
    #[cfg(test)]
    fn column_kinds(&self) -> Option<Vec<Option<ColumnKind>>> {
        self.schema.as_ref().map(|s| {
            s.fields()
                .iter()
                .map(|f| map_arrow_to_kind(f.data_type()))
                .collect()
        })
    }
}

impl SinkWriter for ColumnarSink {
    fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, batch: &RowBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let schema = match &self.schema {
            Some(s) => s.clone(),
            None => {
                let schema = self.derive_schema(batch);
                info!(
                    "Opening Parquet writer for {} with schema [{}]",
                    self.path.display(),
                    schema
                        .fields()
                        .iter()
                        .map(|f| format!("{}: {}", f.name(), f.data_type()))
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                self.writer = Some(self.open_writer(schema.clone())?);
                self.schema = Some(schema.clone());
                schema
            }
        };

        let record_batch = Self::to_record_batch(&schema, batch)?;
        if let Some(writer) = self.writer.as_mut() {
            writer.write(&record_batch)?;
        }
        self.rows += batch.len() as u64;
        debug!("{}: {} rows written", self.path.display(), self.rows);
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<ExportArtifact> {
        let mut this = *self;
        match this.writer.take() {
            Some(writer) => {
                writer.close()?;
            }
            None => {
                info!(
                    "No rows arrived; writing empty Parquet file with {} null-typed columns",
                    this.descriptor.len()
                );
                let writer = this.open_writer(this.null_schema())?;
                writer.close()?;
            }
        }
        ExportArtifact::from_path(this.path)
    }
}
