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

//! # Artifact Publisher
//!
//! Moves a finished export file to the remote repository. The caller picks
//! the delivery strategy explicitly; the publisher only wires the chosen
//! strategy to the repository adapter and reports the outcome.
//!
//! Every invocation ends in success or a fatal error. Nothing is retried and
//! nothing is rolled back: partial remote state (say, a release created
//! before its upload failed) is left for the operator to inspect.

use crate::application::commit_strategy::CommitStrategy;
use crate::application::release_strategy::ReleaseStrategy;
use crate::domain::entities::{CommitTarget, ExportArtifact, PublishReceipt, ReleaseTarget};
use crate::domain::errors::Result;
use crate::ports::repository_port::RepositoryPort;
use log::info;
use std::path::Path;
use std::sync::Arc;

/// Largest file the contents API accepts.
pub const DEFAULT_COMMIT_LIMIT_BYTES: u64 = 100 * 1024 * 1024;

/// A way of moving an artifact to the remote repository.
pub trait DeliveryStrategy {
    fn publish(&self, artifact: &ExportArtifact) -> Result<PublishReceipt>;
}

/// The strategy the caller chose, with its target.
#[derive(Debug, Clone)]
pub enum DeliveryPlan {
    Commit {
        target: CommitTarget,
        max_bytes: u64,
    },
    Release(ReleaseTarget),
}

pub struct ArtifactPublisher {
    repository: Arc<dyn RepositoryPort>,
}

impl ArtifactPublisher {
    pub fn new(repository: Arc<dyn RepositoryPort>) -> Self {
        Self { repository }
    }

    /// Builds the strategy for `plan`.
    pub fn strategy(&self, plan: &DeliveryPlan) -> Box<dyn DeliveryStrategy> {
        match plan {
            DeliveryPlan::Commit { target, max_bytes } => Box::new(CommitStrategy::new(
                self.repository.clone(),
                target.clone(),
                *max_bytes,
            )),
            DeliveryPlan::Release(target) => Box::new(ReleaseStrategy::new(
                self.repository.clone(),
                target.clone(),
            )),
        }
    }

    /// Publishes the closed file at `path` according to `plan`.
    pub fn publish(&self, path: &Path, plan: &DeliveryPlan) -> Result<PublishReceipt> {
        let artifact = ExportArtifact::from_path(path)?;
        info!(
            "Publishing {} ({} bytes)",
            artifact.path.display(),
            artifact.bytes
        );
        let receipt = self.strategy(plan).publish(&artifact)?;
        info!("{}", receipt);
        Ok(receipt)
    }
}
