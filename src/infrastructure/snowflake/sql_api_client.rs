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

//! Thin blocking client for the Snowflake SQL API v2.
//!
//! Only the four calls the exporter needs: submit a statement, check on a
//! running statement, fetch one result partition, and cancel.

use crate::domain::errors::{ExportError, Result};
use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const CLIENT_USER_AGENT: &str = concat!("wh2repo/", env!("CARGO_PKG_VERSION"));
const TOKEN_TYPE_HEADER: &str = "x-snowflake-authorization-token-type";
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Session context sent with every statement.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatementContext {
    pub warehouse: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    statement: &'a str,
    timeout: u64,
    #[serde(flatten)]
    context: &'a StatementContext,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowType {
    pub name: String,
    #[serde(rename = "type")]
    pub sf_type: String,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    pub row_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetMetaData {
    #[serde(default)]
    pub num_rows: u64,
    #[serde(default)]
    pub row_type: Vec<RowType>,
    #[serde(default)]
    pub partition_info: Vec<PartitionInfo>,
}

/// A page of rows. Every cell is the API's string rendering, or null.
pub type RawRows = Vec<Vec<Option<String>>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementResponse {
    pub statement_handle: Option<String>,
    pub message: Option<String>,
    pub result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    pub data: RawRows,
}

/// Outcome of a submit or status call.
pub enum StatementState {
    Complete(StatementResponse),
    Running(String),
}

pub struct SqlApiClient {
    http: Client,
    base: Url,
    token: SecretString,
}

impl SqlApiClient {
    pub fn new(base: &str, token: SecretString, token_type: &str) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|e| {
                ExportError::ConfigError(format!("Invalid Snowflake URL '{}': {}", base, e))
            })?;
        if base.cannot_be_a_base() {
            return Err(ExportError::ConfigError(format!("Invalid Snowflake URL '{}'", base)));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let token_type = HeaderValue::from_str(token_type)
            .map_err(|e| ExportError::ConfigError(format!("Invalid token type: {}", e)))?;
        headers.insert(TOKEN_TYPE_HEADER, token_type);

        let http = Client::builder()
            .user_agent(CLIENT_USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExportError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, base, token })
    }

    fn statements_url(&self, tail: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "v2", "statements"])
                .extend(tail);
        }
        url
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        request
            .bearer_auth(self.token.expose_secret())
            .send()
            .map_err(|e| ExportError::SourceError(format!("Snowflake request failed: {}", e)))
    }

    fn failure(response: Response) -> ExportError {
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        ExportError::SourceError(format!("Snowflake returned HTTP {}: {}", status, body))
    }

    fn state(response: Response) -> Result<StatementState> {
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            return Err(Self::failure(response));
        }
        let body: StatementResponse = response
            .json()
            .map_err(|e| {
                ExportError::SourceError(format!("Unreadable Snowflake response: {}", e))
            })?;
        if status == StatusCode::OK {
            return Ok(StatementState::Complete(body));
        }
        match body.statement_handle {
            Some(handle) => Ok(StatementState::Running(handle)),
            None => Err(ExportError::SourceError(
                "Snowflake accepted the statement without returning a handle".into(),
            )),
        }
    }

    /// `POST /api/v2/statements`
    pub fn submit(
        &self,
        sql: &str,
        timeout_secs: u64,
        context: &StatementContext,
    ) -> Result<StatementState> {
        let body = SubmitRequest {
            statement: sql,
            timeout: timeout_secs,
            context,
        };
        let response = self.send(self.http.post(self.statements_url(&[])).json(&body))?;
        debug!("POST statements -> {}", response.status().as_u16());
        Self::state(response)
    }

    /// `GET /api/v2/statements/{handle}`
    pub fn status(&self, handle: &str) -> Result<StatementState> {
        let response = self.send(self.http.get(self.statements_url(&[handle])))?;
        debug!("GET statements/{} -> {}", handle, response.status().as_u16());
        Self::state(response)
    }

    /// `GET /api/v2/statements/{handle}?partition={n}`
    pub fn partition(&self, handle: &str, n: usize) -> Result<RawRows> {
        let mut url = self.statements_url(&[handle]);
        url.query_pairs_mut().append_pair("partition", &n.to_string());

        let response = self.send(self.http.get(url))?;
        debug!("GET statements/{}?partition={} -> {}", handle, n, response.status().as_u16());
        if response.status() != StatusCode::OK {
            return Err(Self::failure(response));
        }
        let body: StatementResponse = response
            .json()
            .map_err(|e| ExportError::SourceError(format!("Unreadable partition {}: {}", n, e)))?;
        Ok(body.data)
    }

    /// `POST /api/v2/statements/{handle}/cancel`
    pub fn cancel(&self, handle: &str) -> Result<()> {
        let response = self.send(self.http.post(self.statements_url(&[handle, "cancel"])))?;
        if !response.status().is_success() {
            return Err(Self::failure(response));
        }
        Ok(())
    }
}
