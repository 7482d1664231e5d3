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

//! Infrastructure adapter that runs a query through the Snowflake SQL API.
//!
//! Statements that finish quickly come back complete from the submit call.
//! Slower ones are acknowledged with a handle and polled until they finish.
//! The column list is taken from the result metadata before any row is read.

use crate::domain::entities::{Column, QueryDescriptor};
use crate::domain::errors::{ExportError, Result};
use crate::domain::mapping::map_snowflake_type;
use crate::infrastructure::snowflake::result_cursor::SnowflakeCursor;
use crate::infrastructure::snowflake::sql_api_client::{
    SqlApiClient, StatementContext, StatementResponse, StatementState,
};
use crate::ports::batch_source::RowBatchSource;
use crate::ports::warehouse_port::WarehousePort;
use log::info;
use secrecy::SecretString;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TOKEN_TYPE: &str = "PROGRAMMATIC_ACCESS_TOKEN";

/// Connection settings for one account.
#[derive(Clone)]
pub struct SnowflakeSettings {
    /// Account identifier, e.g. `xy12345.ca-central-1`.
    pub account: String,
    pub token: SecretString,
    /// `PROGRAMMATIC_ACCESS_TOKEN`, `OAUTH` or `KEYPAIR_JWT`.
    pub token_type: String,
    pub context: StatementContext,
    /// Server-side statement timeout; 0 lets the account default apply.
    pub statement_timeout_secs: u64,
    pub poll_interval: Duration,
    /// Overrides `https://{account}.snowflakecomputing.com`.
    pub base_url: Option<String>,
}

impl fmt::Debug for SnowflakeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeSettings")
            .field("account", &self.account)
            .field("token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("context", &self.context)
            .field("statement_timeout_secs", &self.statement_timeout_secs)
            .field("poll_interval", &self.poll_interval)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SnowflakeSettings {
    pub fn endpoint(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.snowflakecomputing.com", self.account))
    }
}

pub struct SnowflakeWarehouseAdapter {
    api: Arc<SqlApiClient>,
    context: StatementContext,
    statement_timeout_secs: u64,
    poll_interval: Duration,
}

impl SnowflakeWarehouseAdapter {
    pub fn new(settings: SnowflakeSettings) -> Result<Self> {
        let api = SqlApiClient::new(&settings.endpoint(), settings.token, &settings.token_type)?;
        Ok(Self {
            api: Arc::new(api),
            context: settings.context,
            statement_timeout_secs: settings.statement_timeout_secs,
            poll_interval: settings.poll_interval,
        })
    }

    fn wait_for(&self, mut state: StatementState) -> Result<StatementResponse> {
        let mut polls = 0u64;
        loop {
            match state {
                StatementState::Complete(response) => return Ok(response),
                StatementState::Running(handle) => {
                    polls += 1;
                    if polls % 20 == 1 {
                        info!("Statement {} still running", handle);
                    }
                    std::thread::sleep(self.poll_interval);
                    state = self.api.status(&handle)?;
                }
            }
        }
    }
}

fn descriptor_of(response: &StatementResponse) -> Result<QueryDescriptor> {
    let meta = response
        .result_set_meta_data
        .as_ref()
        .ok_or_else(|| {
            ExportError::SourceError("Snowflake response has no result metadata".into())
        })?;
    Ok(QueryDescriptor::new(
        meta.row_type
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                kind: Some(map_snowflake_type(&c.sf_type, c.precision, c.scale)),
            })
            .collect(),
    ))
}

impl WarehousePort for SnowflakeWarehouseAdapter {
    fn execute(&self, sql: &str) -> Result<Box<dyn RowBatchSource>> {
        let submitted = self
            .api
            .submit(sql, self.statement_timeout_secs, &self.context)?;
        let mut response = self.wait_for(submitted)?;

        let descriptor = descriptor_of(&response)?;
        let handle = response.statement_handle.clone().unwrap_or_default();
        let (partitions, rows) = response
            .result_set_meta_data
            .as_ref()
            .map(|m| (m.partition_info.len(), m.num_rows))
            .unwrap_or((1, 0));
        info!(
            "Statement {} finished: {} rows in {} partition(s)",
            handle, rows, partitions
        );

        let first = std::mem::take(&mut response.data);
        Ok(Box::new(SnowflakeCursor::new(
            self.api.clone(),
            handle,
            descriptor,
            first,
            partitions,
        )))
    }
}
