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

//! In-memory row source. Serves rows that are already materialized, which
//! is what tests and dry runs need.

use crate::domain::entities::{QueryDescriptor, Row, RowBatch};
use crate::domain::errors::Result;
use crate::ports::batch_source::RowBatchSource;
use std::collections::VecDeque;

pub struct MemorySource {
    descriptor: QueryDescriptor,
    rows: VecDeque<Row>,
}

impl MemorySource {
    pub fn new(descriptor: QueryDescriptor, rows: Vec<Row>) -> Self {
        Self {
            descriptor,
            rows: rows.into(),
        }
    }
}

impl RowBatchSource for MemorySource {
    fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    fn next_batch(&mut self, chunk_size: usize) -> Result<RowBatch> {
        let take = chunk_size.max(1).min(self.rows.len());
        Ok(self.rows.drain(..take).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Value;
    use crate::ports::batch_source::batches;

    fn source(n: i64) -> MemorySource {
        MemorySource::new(
            QueryDescriptor::from_names(["id"]),
            (1..=n).map(|i| vec![Value::Int(i)]).collect(),
        )
    }

    #[test]
    fn test_chunking_preserves_count_and_order() {
        let total = 23;
        let expected: Vec<Row> = (1..=total).map(|i| vec![Value::Int(i)]).collect();

        for chunk_size in 1..=(total as usize + 2) {
            let mut src = source(total);
            let mut seen = Vec::new();
            for batch in batches(&mut src, chunk_size) {
                let batch = batch.unwrap();
                assert!(!batch.is_empty());
                assert!(batch.len() <= chunk_size);
                seen.extend(batch);
            }
            assert_eq!(seen, expected, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_exhausted_source_stays_exhausted() {
        let mut src = source(2);
        assert_eq!(src.next_batch(5).unwrap().len(), 2);
        assert!(src.next_batch(5).unwrap().is_empty());
        assert!(src.next_batch(5).unwrap().is_empty());
    }
}
