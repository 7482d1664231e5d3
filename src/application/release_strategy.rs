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

//! # Release Strategy
//!
//! Attaches the artifact to a release identified by tag, creating the
//! release when the tag has none. A release cannot hold two assets with the
//! same name, so any existing asset with the target name is deleted first.
//!
//! Steps run in order and the first failure stops the run. A release that
//! was created before a failed upload stays in place.

use crate::application::publisher::DeliveryStrategy;
use crate::domain::entities::{ExportArtifact, PublishReceipt, ReleaseTarget};
use crate::domain::errors::Result;
use crate::ports::repository_port::{Release, RepositoryPort};
use log::{info, warn};
use std::sync::Arc;

pub struct ReleaseStrategy {
    repository: Arc<dyn RepositoryPort>,
    target: ReleaseTarget,
}

impl ReleaseStrategy {
    pub fn new(repository: Arc<dyn RepositoryPort>, target: ReleaseTarget) -> Self {
        Self { repository, target }
    }

    /// Returns the release for the tag and whether this call created it.
    fn find_or_create(&self) -> Result<(Release, bool)> {
        let t = &self.target;
        if let Some(release) = self.repository.release_by_tag(&t.repo, &t.tag)? {
            info!("Using existing release {} (id {})", release.tag, release.id);
            return Ok((release, false));
        }
        let release = self
            .repository
            .create_release(&t.repo, &t.tag, t.name.as_deref())?;
        info!("Created release {} (id {})", release.tag, release.id);
        Ok((release, true))
    }

    /// Deletes every asset named like the one we are about to upload.
    fn clear_same_name(&self, release: &Release) -> Result<bool> {
        let mut replaced = false;
        for asset in self.repository.list_assets(&self.target.repo, release)? {
            if asset.name == self.target.asset_name {
                warn!("Deleting existing asset {} (id {})", asset.name, asset.id);
                self.repository.delete_asset(&self.target.repo, asset.id)?;
                replaced = true;
            }
        }
        Ok(replaced)
    }
}

impl DeliveryStrategy for ReleaseStrategy {
    fn publish(&self, artifact: &ExportArtifact) -> Result<PublishReceipt> {
        let (release, release_created) = self.find_or_create()?;
        let replaced_existing = self.clear_same_name(&release)?;

        let asset = self
            .repository
            .upload_asset(&release, &self.target.asset_name, artifact)?;

        Ok(PublishReceipt::Released {
            tag: release.tag,
            asset_name: asset.name,
            release_created,
            replaced_existing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::FakeRepository;
    use crate::domain::errors::{DeliveryStage, ExportError};
    use std::path::Path;

    fn target() -> ReleaseTarget {
        ReleaseTarget {
            repo: "acme/data".into(),
            tag: "data-20261019".into(),
            name: Some("Data export 20261019".into()),
            asset_name: "export.parquet".into(),
        }
    }

    fn artifact(dir: &Path, content: &[u8]) -> ExportArtifact {
        let path = dir.join("export.parquet");
        std::fs::write(&path, content).unwrap();
        ExportArtifact::from_path(path).unwrap()
    }

    #[test]
    fn test_first_publish_creates_release() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(FakeRepository::default());
        let strategy = ReleaseStrategy::new(repo.clone(), target());

        let receipt = strategy.publish(&artifact(dir.path(), b"v1")).unwrap();

        assert_eq!(
            receipt,
            PublishReceipt::Released {
                tag: "data-20261019".into(),
                asset_name: "export.parquet".into(),
                release_created: true,
                replaced_existing: false,
            }
        );
        assert_eq!(repo.release_count(), 1);
    }

    #[test]
    fn test_republish_replaces_asset_in_same_release() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(FakeRepository::default());
        let strategy = ReleaseStrategy::new(repo.clone(), target());

        strategy.publish(&artifact(dir.path(), b"v1")).unwrap();
        let receipt = strategy.publish(&artifact(dir.path(), b"v2")).unwrap();

        assert!(matches!(
            receipt,
            PublishReceipt::Released {
                release_created: false,
                replaced_existing: true,
                ..
            }
        ));
        assert_eq!(repo.release_count(), 1);
        assert_eq!(repo.asset_names("data-20261019"), vec!["export.parquet"]);
        assert_eq!(
            repo.asset_content("data-20261019", "export.parquet").unwrap(),
            b"v2"
        );
    }

    #[test]
    fn test_other_assets_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(FakeRepository::default());
        let mut other = target();
        other.asset_name = "export.csv.gz".into();

        ReleaseStrategy::new(repo.clone(), other)
            .publish(&artifact(dir.path(), b"csv"))
            .unwrap();
        ReleaseStrategy::new(repo.clone(), target())
            .publish(&artifact(dir.path(), b"pq"))
            .unwrap();

        let mut names = repo.asset_names("data-20261019");
        names.sort();
        assert_eq!(names, vec!["export.csv.gz", "export.parquet"]);
    }

    #[test]
    fn test_failed_upload_keeps_created_release() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(FakeRepository::default());
        repo.fail_uploads();
        let strategy = ReleaseStrategy::new(repo.clone(), target());

        let err = strategy.publish(&artifact(dir.path(), b"v1")).unwrap_err();

        assert_eq!(err.exit_code(), 5);
        assert!(matches!(
            err,
            ExportError::DeliveryError {
                stage: DeliveryStage::Upload,
                status: 502,
                ..
            }
        ));
        assert_eq!(repo.release_count(), 1);
        assert!(repo.asset_names("data-20261019").is_empty());
    }
}
