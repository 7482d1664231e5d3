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

//! Core error definitions for the exporter.
//!
//! This module provides a centralized `ExportError` enum and a `Result` type
//! used throughout the application. Every variant maps to a distinct process
//! exit code so an operator can tell from the exit status alone which stage
//! of a run failed.

use std::fmt;
use thiserror::Error;

/// The remote call that a `DeliveryError` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStage {
    /// Probing for an existing file, looking up a release, or listing assets.
    Lookup,
    /// Writing file contents on a branch.
    Commit,
    /// Creating a release for a tag.
    CreateRelease,
    /// Removing a same-named asset before re-upload.
    DeleteAsset,
    /// Uploading the release asset.
    Upload,
}

impl fmt::Display for DeliveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStage::Lookup => write!(f, "lookup"),
            DeliveryStage::Commit => write!(f, "commit"),
            DeliveryStage::CreateRelease => write!(f, "create release"),
            DeliveryStage::DeleteAsset => write!(f, "delete asset"),
            DeliveryStage::Upload => write!(f, "upload asset"),
        }
    }
}

/// Error types encountered during export and publication.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown delivery mode '{0}': expected 'contents' or 'release'")]
    UnknownDeliveryMode(String),

    #[error("Query source error: {0}")]
    QuerySourceError(String),

    #[error("Source error: {0}")]
    SourceError(String),

    #[error("Schema consistency error in column '{column}': expected {expected}, found {found}")]
    SchemaConsistencyError {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Artifact is {size} bytes, above the {limit} byte limit of the contents API; use release mode instead")]
    SizeLimitError { size: u64, limit: u64 },

    #[error("Delivery failed at {stage}: HTTP {status}: {body}")]
    DeliveryError {
        stage: DeliveryStage,
        status: u16,
        body: String,
    },

    #[error("Artifact generation failed: {0}")]
    ArtifactError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ExportError {
    /// Builds a `DeliveryError` from a remote status and response body.
    pub fn delivery(stage: DeliveryStage, status: u16, body: impl Into<String>) -> Self {
        ExportError::DeliveryError {
            stage,
            status,
            body: body.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExportError::ConfigError(_) => 1,
            ExportError::SizeLimitError { .. } => 2,
            ExportError::DeliveryError { stage, .. } => match stage {
                DeliveryStage::Commit => 3,
                DeliveryStage::CreateRelease => 4,
                DeliveryStage::Upload => 5,
                DeliveryStage::Lookup => 8,
                DeliveryStage::DeleteAsset => 9,
            },
            ExportError::UnknownDeliveryMode(_) => 6,
            ExportError::QuerySourceError(_) => 7,
            ExportError::SourceError(_) => 10,
            ExportError::SchemaConsistencyError { .. } => 11,
            ExportError::ArtifactError(_) | ExportError::IoError(_) => 12,
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        ExportError::ArtifactError(e.to_string())
    }
}

impl From<parquet::errors::ParquetError> for ExportError {
    fn from(e: parquet::errors::ParquetError) -> Self {
        ExportError::ArtifactError(e.to_string())
    }
}

impl From<arrow_schema::ArrowError> for ExportError {
    fn from(e: arrow_schema::ArrowError) -> Self {
        ExportError::ArtifactError(e.to_string())
    }
}

/// A specialized Result type for the exporter.
pub type Result<T> = std::result::Result<T, ExportError>;
