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

//! # Export Pipeline
//!
//! Drives a `RowBatchSource` into a `SinkWriter` one batch at a time. Memory
//! use is bounded by the chunk size, never by the size of the result set.

use crate::domain::entities::ExportArtifact;
use crate::domain::errors::{ExportError, Result};
use crate::ports::batch_source::{batches, RowBatchSource};
use crate::ports::sink_writer::SinkWriter;
use log::{debug, warn};
use std::path::Path;

/// Rows moved by a run and the closed file they landed in.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub rows: u64,
    pub artifact: ExportArtifact,
}

pub struct ExportPipeline {
    chunk_size: usize,
}

impl ExportPipeline {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Pulls every batch from `source` into `sink`, then finalizes the sink.
    ///
    /// Zero rows is a normal outcome and still finalizes, so the artifact is
    /// well formed. On any error the partially written file is removed.
    pub fn run(
        &self,
        source: &mut dyn RowBatchSource,
        mut sink: Box<dyn SinkWriter>,
    ) -> Result<PipelineOutput> {
        let path = sink.path().to_path_buf();
        let outcome = match self.drain(source, sink.as_mut()) {
            Ok(rows) => sink
                .finalize()
                .map(|artifact| PipelineOutput { rows, artifact }),
            Err(e) => {
                drop(sink);
                Err(e)
            }
        };
        if outcome.is_err() {
            remove_partial(&path);
        }
        outcome
    }

    fn drain(&self, source: &mut dyn RowBatchSource, sink: &mut dyn SinkWriter) -> Result<u64> {
        let width = source.descriptor().len();
        let mut total: u64 = 0;
        let mut batch_no = 0;

        for batch in batches(source, self.chunk_size) {
            let batch = batch?;
            if let Some((i, row)) = batch.iter().enumerate().find(|(_, r)| r.len() != width) {
                return Err(ExportError::SourceError(format!(
                    "row {} has {} values but the query returned {} columns",
                    total + i as u64 + 1,
                    row.len(),
                    width
                )));
            }
            sink.append(&batch)?;
            total += batch.len() as u64;
            batch_no += 1;
            debug!("Batch {}: {} rows (total {})", batch_no, batch.len(), total);
        }

        Ok(total)
    }
}

fn remove_partial(path: &Path) {
    if let Err(rm) = std::fs::remove_file(path) {
        if rm.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove partial artifact {}: {}", path.display(), rm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{FileFormat, QueryDescriptor, RowBatch, Value};
    use crate::infrastructure::memory_source::MemorySource;
    use crate::infrastructure::sinks::{open_sink, SinkOptions};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::fs::File;
    use std::path::PathBuf;

    fn id_name_rows() -> Vec<Vec<Value>> {
        vec![
            vec![Value::Int(1), Value::Text("a".into())],
            vec![Value::Int(2), Value::Text("b".into())],
            vec![Value::Int(3), Value::Text("c".into())],
        ]
    }

    /// Records what the pipeline hands to a sink.
    struct RecordingSink {
        path: PathBuf,
        batches: std::rc::Rc<std::cell::RefCell<Vec<usize>>>,
    }

    impl SinkWriter for RecordingSink {
        fn path(&self) -> &Path {
            &self.path
        }
        fn append(&mut self, batch: &RowBatch) -> Result<()> {
            self.batches.borrow_mut().push(batch.len());
            Ok(())
        }
        fn finalize(self: Box<Self>) -> Result<ExportArtifact> {
            self.batches.borrow_mut().push(0);
            Ok(ExportArtifact {
                path: self.path.clone(),
                bytes: 0,
            })
        }
    }

    /// Writes its rows to disk, then fails to close the file.
    struct BrokenCloseSink {
        path: PathBuf,
    }

    impl SinkWriter for BrokenCloseSink {
        fn path(&self) -> &Path {
            &self.path
        }
        fn append(&mut self, _batch: &RowBatch) -> Result<()> {
            std::fs::write(&self.path, b"id,name\n1,a\n")?;
            Ok(())
        }
        fn finalize(self: Box<Self>) -> Result<ExportArtifact> {
            Err(ExportError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "No space left on device",
            )))
        }
    }

    /// Yields one good batch, then fails.
    struct FailingSource {
        descriptor: QueryDescriptor,
        calls: usize,
    }

    impl RowBatchSource for FailingSource {
        fn descriptor(&self) -> &QueryDescriptor {
            &self.descriptor
        }
        fn next_batch(&mut self, _chunk_size: usize) -> Result<RowBatch> {
            self.calls += 1;
            if self.calls == 1 {
                Ok(vec![vec![Value::Int(1), Value::Text("a".into())]])
            } else {
                Err(ExportError::SourceError("connection reset".into()))
            }
        }
    }

    #[test]
    fn test_csv_scenario_with_chunk_size_two() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        let descriptor = QueryDescriptor::from_names(["id", "name"]);
        let mut source = MemorySource::new(descriptor.clone(), id_name_rows());
        let sink = open_sink(FileFormat::Csv, &path, &descriptor, &SinkOptions::default()).unwrap();

        let out = ExportPipeline::new(2).run(&mut source, sink).unwrap();

        assert_eq!(out.rows, 3);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "id,name\n1,a\n2,b\n3,c\n"
        );
        assert_eq!(out.artifact.bytes, std::fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn test_zero_rows_still_produces_parquet_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.parquet");
        let descriptor = QueryDescriptor::from_names(["id", "name"]);
        let mut source = MemorySource::new(descriptor.clone(), vec![]);
        let sink =
            open_sink(FileFormat::Parquet, &path, &descriptor, &SinkOptions::default()).unwrap();

        let out = ExportPipeline::new(2).run(&mut source, sink).unwrap();

        assert_eq!(out.rows, 0);
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap()).unwrap();
        let names: Vec<String> = builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["id", "name"]);
        assert_eq!(builder.metadata().file_metadata().num_rows(), 0);
    }

    #[test]
    fn test_every_batch_forwarded_once_and_finalize_called() {
        let calls = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = Box::new(RecordingSink {
            path: PathBuf::from("unused"),
            batches: calls.clone(),
        });
        let mut source = MemorySource::new(
            QueryDescriptor::from_names(["id"]),
            (0..7).map(|i| vec![Value::Int(i)]).collect(),
        );

        let out = ExportPipeline::new(3).run(&mut source, sink).unwrap();

        assert_eq!(out.rows, 7);
        // 0 marks the finalize call
        assert_eq!(*calls.borrow(), vec![3, 3, 1, 0]);
    }

    #[test]
    fn test_source_failure_aborts_and_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.csv");
        let descriptor = QueryDescriptor::from_names(["id", "name"]);
        let mut source = FailingSource {
            descriptor: descriptor.clone(),
            calls: 0,
        };
        let sink = open_sink(FileFormat::Csv, &path, &descriptor, &SinkOptions::default()).unwrap();

        let err = ExportPipeline::new(1).run(&mut source, sink).unwrap_err();

        assert!(matches!(err, ExportError::SourceError(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_finalize_failure_removes_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.csv.gz");
        let descriptor = QueryDescriptor::from_names(["id", "name"]);
        let mut source = MemorySource::new(descriptor, id_name_rows());
        let sink = Box::new(BrokenCloseSink { path: path.clone() });

        let err = ExportPipeline::new(2).run(&mut source, sink).unwrap_err();

        assert_eq!(err.exit_code(), 12);
        assert!(err.to_string().contains("No space left"));
        assert!(!path.exists());
    }

    #[test]
    fn test_row_arity_mismatch_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arity.csv");
        let descriptor = QueryDescriptor::from_names(["id", "name"]);
        let mut source = MemorySource::new(
            descriptor.clone(),
            vec![
                vec![Value::Int(1), Value::Text("a".into())],
                vec![Value::Int(2)],
            ],
        );
        let sink = open_sink(FileFormat::Csv, &path, &descriptor, &SinkOptions::default()).unwrap();

        let err = ExportPipeline::new(10).run(&mut source, sink).unwrap_err();

        match err {
            ExportError::SourceError(msg) => assert!(msg.contains("row 2")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
