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

//! # Batch Source Port
//!
//! This Port defines the contract for the "Data Mover" input side: an
//! executed query whose rows can be pulled in bounded batches.
//!
//! A source is single pass. Once a batch has been returned it is never
//! returned again, and an empty batch means the result set is exhausted.

use crate::domain::entities::{QueryDescriptor, RowBatch};
use crate::domain::errors::Result;

/// `RowBatchSource` wraps an executed query cursor.
pub trait RowBatchSource {
    /// The column list, captured before any row was read.
    fn descriptor(&self) -> &QueryDescriptor;

    /// Returns up to `chunk_size` rows in warehouse order.
    ///
    /// An empty batch signals exhaustion. Any fetch failure is fatal for the
    /// whole export.
    fn next_batch(&mut self, chunk_size: usize) -> Result<RowBatch>;
}

/// Iterator over the batches of a source. Stops at exhaustion or at the first error.
pub struct Batches<'a, S: RowBatchSource + ?Sized> {
    source: &'a mut S,
    chunk_size: usize,
    done: bool,
}

impl<S: RowBatchSource + ?Sized> Iterator for Batches<'_, S> {
    type Item = Result<RowBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.source.next_batch(self.chunk_size) {
            Ok(batch) if batch.is_empty() => {
                self.done = true;
                None
            }
            Ok(batch) => Some(Ok(batch)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Borrows `source` as a lazy sequence of batches of at most `chunk_size` rows.
pub fn batches<S: RowBatchSource + ?Sized>(source: &mut S, chunk_size: usize) -> Batches<'_, S> {
    Batches {
        source,
        chunk_size: chunk_size.max(1),
        done: false,
    }
}
