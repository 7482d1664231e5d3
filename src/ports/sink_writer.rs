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

//! Port for materializing row batches into a single output file.

use crate::domain::entities::{ExportArtifact, RowBatch};
use crate::domain::errors::Result;
use std::path::Path;

/// A sink owns exactly one output file for the duration of an export.
///
/// Implementations keep their own buffering and writer state; the pipeline
/// only ever sees this capability.
pub trait SinkWriter {
    /// The file this sink writes to.
    fn path(&self) -> &Path;

    /// Writes one non-empty batch, in descriptor column order.
    fn append(&mut self, batch: &RowBatch) -> Result<()>;

    /// Flushes and closes the file. The returned artifact is complete on disk.
    fn finalize(self: Box<Self>) -> Result<ExportArtifact>;
}
