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

//! Delimited text sink: one CSV record per row, optionally gzip compressed.
//!
//! Compression is chosen by the output target (a `.gz` suffix), never by
//! the sink logic itself. The gzip trailer is only written in `finalize`.

use crate::domain::entities::{ExportArtifact, QueryDescriptor, RowBatch};
use crate::domain::errors::{ExportError, Result};
use crate::ports::sink_writer::SinkWriter;
use csv::{QuoteStyle, Writer, WriterBuilder};
use flate2::write::GzEncoder;
use flate2::Compression as GzipCompression;
use log::debug;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Byte stream under the CSV writer: a plain buffered file or a gzip encoder over one.
enum OutputStream {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputStream {
    fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        let buf_writer = BufWriter::with_capacity(128 * 1024, file);
        let gzip = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);
        if gzip {
            Ok(OutputStream::Gzip(GzEncoder::new(
                buf_writer,
                GzipCompression::default(),
            )))
        } else {
            Ok(OutputStream::Plain(buf_writer))
        }
    }

    /// Writes any compression trailer, flushes and syncs the file.
    fn finish(self) -> io::Result<()> {
        let buf_writer = match self {
            OutputStream::Plain(w) => w,
            OutputStream::Gzip(enc) => enc.finish()?,
        };
        let file = buf_writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputStream::Plain(w) => w.write(buf),
            OutputStream::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputStream::Plain(w) => w.flush(),
            OutputStream::Gzip(w) => w.flush(),
        }
    }
}

/// Streams rows to a delimited text file.
pub struct DelimitedTextSink {
    path: PathBuf,
    writer: Writer<OutputStream>,
    rows: u64,
}

impl DelimitedTextSink {
    /// Creates the output file and writes the header line from the descriptor.
    pub fn create(path: &Path, descriptor: &QueryDescriptor, delimiter: u8) -> Result<Self> {
        let stream = OutputStream::create(path)?;
        let mut writer = WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(stream);

        writer.write_record(descriptor.names())?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }
}

impl SinkWriter for DelimitedTextSink {
    fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, batch: &RowBatch) -> Result<()> {
        for row in batch {
            self.writer
                .write_record(row.iter().map(|v| v.to_string()))?;
        }
        self.rows += batch.len() as u64;
        debug!("{}: {} rows written", self.path.display(), self.rows);
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<ExportArtifact> {
        let this = *self;
        let stream = this
            .writer
            .into_inner()
            .map_err(|e| ExportError::IoError(e.into_error()))?;
        stream.finish()?;
        ExportArtifact::from_path(this.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Value;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn descriptor() -> QueryDescriptor {
        QueryDescriptor::from_names(["id", "name"])
    }

    fn row(id: i64, name: &str) -> Vec<Value> {
        vec![Value::Int(id), Value::Text(name.to_string())]
    }

    fn read_gz(path: &Path) -> String {
        let mut out = String::new();
        GzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_zero_batches_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        let sink = Box::new(DelimitedTextSink::create(&path, &descriptor(), b',').unwrap());
        let artifact = sink.finalize().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "id,name\n");
        assert_eq!(content.lines().count(), 1);
        assert_eq!(artifact.bytes, content.len() as u64);
    }

    #[test]
    fn test_gzip_output_is_complete_after_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv.gz");

        let mut sink = Box::new(DelimitedTextSink::create(&path, &descriptor(), b',').unwrap());
        sink.append(&vec![row(1, "a"), row(2, "b")]).unwrap();
        sink.append(&vec![row(3, "c")]).unwrap();
        sink.finalize().unwrap();

        assert_eq!(read_gz(&path), "id,name\n1,a\n2,b\n3,c\n");
    }

    #[test]
    fn test_fields_are_quoted_only_when_needed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quoted.csv");

        let mut sink = Box::new(DelimitedTextSink::create(&path, &descriptor(), b',').unwrap());
        sink.append(&vec![
            row(1, "plain"),
            row(2, "with,comma"),
            row(3, "say \"hi\""),
            vec![Value::Int(4), Value::Null],
        ])
        .unwrap();
        sink.finalize().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "id,name\n1,plain\n2,\"with,comma\"\n3,\"say \"\"hi\"\"\"\n4,\n"
        );
    }

    #[test]
    fn test_custom_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabs.tsv");

        let mut sink = Box::new(DelimitedTextSink::create(&path, &descriptor(), b'\t').unwrap());
        sink.append(&vec![row(1, "a")]).unwrap();
        sink.finalize().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "id\tname\n1\ta\n");
    }

    #[test]
    fn test_warehouse_numbers_and_times_are_written_exactly() {
        use crate::domain::mapping::map_snowflake_type;
        use crate::infrastructure::snowflake::result_cursor::parse_cell;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typed.csv");
        let kinds = [
            map_snowflake_type("fixed", Some(19), Some(2)),
            map_snowflake_type("fixed", Some(38), Some(0)),
            map_snowflake_type("time", None, Some(9)),
            map_snowflake_type("timestamp_tz", None, Some(9)),
        ];
        let cells = [
            [
                "12345678901234567.89",
                "99999999999999999999",
                "45045.000000000",
                "1698417045.123456 1020",
            ],
            ["1.50", "-7", "0.5", "1698417045 1440"],
        ];
        let rows: Vec<Vec<Value>> = cells
            .iter()
            .map(|r| {
                r.iter()
                    .zip(kinds)
                    .map(|(cell, kind)| parse_cell(kind, Some(cell.to_string())).unwrap())
                    .collect()
            })
            .collect();

        let descriptor = QueryDescriptor::from_names(["AMT", "BIG", "AT", "SEEN"]);
        let mut sink = Box::new(DelimitedTextSink::create(&path, &descriptor, b',').unwrap());
        sink.append(&rows).unwrap();
        sink.finalize().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "AMT,BIG,AT,SEEN\n\
             12345678901234567.89,99999999999999999999,12:30:45.000000,2023-10-27 07:30:45.123456-07:00\n\
             1.50,-7,00:00:00.500000,2023-10-27 14:30:45.000000+00:00\n"
        );
    }
}
