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

//! # Export Orchestrator
//!
//! The top-level sequence of one run: read the query text, execute it on the
//! warehouse, stream the result into the chosen file format, and optionally
//! hand the closed file to the publisher.

use crate::application::pipeline::ExportPipeline;
use crate::application::publisher::{ArtifactPublisher, DeliveryPlan};
use crate::domain::entities::{ExportReport, FileFormat, PublishReceipt};
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::sinks::{open_sink, SinkOptions};
use crate::ports::warehouse_port::WarehousePort;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Everything one export needs to know.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub sql_file: PathBuf,
    pub output: PathBuf,
    pub format: FileFormat,
    pub chunk_size: usize,
    pub sink: SinkOptions,
}

/// Reads and trims the query text. A missing or blank file is fatal.
pub fn read_query(path: &Path) -> Result<String> {
    let sql = std::fs::read_to_string(path).map_err(|e| {
        ExportError::QuerySourceError(format!("cannot read {}: {}", path.display(), e))
    })?;
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(ExportError::QuerySourceError(format!(
            "{} is empty",
            path.display()
        )));
    }
    Ok(sql.to_string())
}

pub struct ExportOrchestrator {
    warehouse: Arc<dyn WarehousePort>,
}

impl ExportOrchestrator {
    pub fn new(warehouse: Arc<dyn WarehousePort>) -> Self {
        Self { warehouse }
    }

    /// Runs the query and writes the result to `job.output`.
    pub fn export(&self, job: &ExportJob) -> Result<ExportReport> {
        let sql = read_query(&job.sql_file)?;
        if let Some(parent) = job.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let start = Instant::now();
        info!("Executing query from {}", job.sql_file.display());
        let mut source = self.warehouse.execute(&sql)?;
        if source.descriptor().is_empty() {
            return Err(ExportError::SourceError(
                "the statement returned no result columns".into(),
            ));
        }
        info!("Query returned columns: {:?}", source.descriptor().names());

        let sink = open_sink(job.format, &job.output, source.descriptor(), &job.sink)?;
        let output = ExportPipeline::new(job.chunk_size).run(source.as_mut(), sink)?;
        let duration = start.elapsed().as_secs_f64();

        let report = ExportReport {
            path: output.artifact.path.clone(),
            format: job.format,
            rows: output.rows,
            bytes: output.artifact.bytes,
            duration,
        };
        let mb_per_sec = if duration > 0.0 {
            (report.bytes as f64 / 1024.0 / 1024.0) / duration
        } else {
            0.0
        };
        info!(
            "Wrote {} rows ({} bytes, {}) to {} in {:.2}s ({:.2} MB/s)",
            report.rows,
            report.bytes,
            report.format,
            report.path.display(),
            report.duration,
            mb_per_sec
        );
        Ok(report)
    }

    /// Exports, then publishes the resulting file according to `plan`.
    pub fn export_and_publish(
        &self,
        job: &ExportJob,
        publisher: &ArtifactPublisher,
        plan: &DeliveryPlan,
    ) -> Result<(ExportReport, PublishReceipt)> {
        let report = self.export(job)?;
        let receipt = publisher.publish(&report.path, plan)?;
        Ok((report, receipt))
    }
}
