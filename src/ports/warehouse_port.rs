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

//! # Warehouse Port
//!
//! The only thing the exporter needs from a warehouse is "run this SQL and
//! hand me a cursor". Session context (database, schema, role, compute) is
//! the adapter's business and is fixed when the adapter is built.

use crate::domain::errors::Result;
use crate::ports::batch_source::RowBatchSource;

pub trait WarehousePort {
    /// Executes one parameterless statement and returns its open cursor.
    fn execute(&self, sql: &str) -> Result<Box<dyn RowBatchSource>>;
}
