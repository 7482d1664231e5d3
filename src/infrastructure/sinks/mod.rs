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

//! File sinks and the factory that picks one for an export.

pub mod columnar_sink;
pub mod delimited_sink;

use crate::domain::entities::{FileFormat, QueryDescriptor};
use crate::domain::errors::Result;
use crate::ports::sink_writer::SinkWriter;
use columnar_sink::ColumnarSink;
use delimited_sink::DelimitedTextSink;
use std::path::Path;

/// Format-specific knobs for a sink.
#[derive(Debug, Clone)]
pub struct SinkOptions {
    /// Field delimiter for delimited output.
    pub delimiter: u8,
    /// Parquet codec name (snappy, gzip, zstd, lz4, brotli, none).
    pub parquet_compression: Option<String>,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            parquet_compression: None,
        }
    }
}

/// Opens the sink for `format` at `path`.
pub fn open_sink(
    format: FileFormat,
    path: &Path,
    descriptor: &QueryDescriptor,
    options: &SinkOptions,
) -> Result<Box<dyn SinkWriter>> {
    match format {
        FileFormat::Csv => Ok(Box::new(DelimitedTextSink::create(
            path,
            descriptor,
            options.delimiter,
        )?)),
        FileFormat::Parquet => Ok(Box::new(ColumnarSink::new(
            path,
            descriptor,
            ColumnarSink::map_parquet_compression(options.parquet_compression.as_deref()),
        ))),
    }
}
