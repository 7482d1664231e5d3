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

//! # Commit Strategy
//!
//! Writes the artifact as a file on a branch through the contents API.
//!
//! The remote only accepts an update of an existing file when the request
//! carries that file's current revision marker, so the marker is looked up
//! right before the write. If another writer changes the file in between,
//! the remote rejects our write and the rejection is reported as is.

use crate::application::publisher::DeliveryStrategy;
use crate::domain::entities::{CommitTarget, ExportArtifact, PublishReceipt};
use crate::domain::errors::{ExportError, Result};
use crate::ports::repository_port::{FileWrite, RepositoryPort};
use base64::{engine::general_purpose, Engine as _};
use log::info;
use std::sync::Arc;

pub struct CommitStrategy {
    repository: Arc<dyn RepositoryPort>,
    target: CommitTarget,
    max_bytes: u64,
}

impl CommitStrategy {
    pub fn new(repository: Arc<dyn RepositoryPort>, target: CommitTarget, max_bytes: u64) -> Self {
        Self {
            repository,
            target,
            max_bytes,
        }
    }

    /// Fails fast, before any network call, when the file is too big for this API.
    fn check_size(&self, artifact: &ExportArtifact) -> Result<()> {
        let size = std::fs::metadata(&artifact.path)?.len();
        if size > self.max_bytes {
            return Err(ExportError::SizeLimitError {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

impl DeliveryStrategy for CommitStrategy {
    fn publish(&self, artifact: &ExportArtifact) -> Result<PublishReceipt> {
        self.check_size(artifact)?;

        let bytes = std::fs::read(&artifact.path)?;
        let content = general_purpose::STANDARD.encode(&bytes);

        let t = &self.target;
        let sha = self.repository.file_sha(&t.repo, &t.path, &t.branch)?;
        match &sha {
            Some(s) => info!("{}@{}:{} exists at {}, updating", t.repo, t.branch, t.path, s),
            None => info!("{}@{}:{} does not exist yet, creating", t.repo, t.branch, t.path),
        }

        let write = FileWrite {
            path: &t.path,
            branch: &t.branch,
            message: &t.message,
            content: &content,
            sha: sha.as_deref(),
        };
        let status = self.repository.put_file(&t.repo, &write)?;

        Ok(PublishReceipt::Committed {
            status,
            repo: t.repo.clone(),
            branch: t.branch.clone(),
            path: t.path.clone(),
        })
    }
}
