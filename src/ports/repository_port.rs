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

//! # Repository Port
//!
//! The remote operations the delivery strategies are built from. Each call
//! maps to one API request; an adapter turns every non-success response into
//! an `ExportError::DeliveryError` carrying the remote status and body.

use crate::domain::entities::{CommitStatus, ExportArtifact};
use crate::domain::errors::Result;

/// A file write on a branch.
#[derive(Debug, Clone)]
pub struct FileWrite<'a> {
    pub path: &'a str,
    pub branch: &'a str,
    pub message: &'a str,
    /// Base64 encoded file contents.
    pub content: &'a str,
    /// Revision marker of the file being replaced. Absent for a first write.
    pub sha: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    pub id: u64,
    pub tag: String,
    /// Upload endpoint for assets, without the URI template suffix.
    pub upload_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseAsset {
    pub id: u64,
    pub name: String,
}

pub trait RepositoryPort {
    /// Returns the revision marker of `path` on `branch`, or `None` if the file does not exist.
    fn file_sha(&self, repo: &str, path: &str, branch: &str) -> Result<Option<String>>;

    /// Creates or updates a file. Only "created" and "updated" count as success.
    fn put_file(&self, repo: &str, write: &FileWrite<'_>) -> Result<CommitStatus>;

    /// Looks a release up by tag; `None` when no release has that tag.
    fn release_by_tag(&self, repo: &str, tag: &str) -> Result<Option<Release>>;

    fn create_release(&self, repo: &str, tag: &str, name: Option<&str>) -> Result<Release>;

    fn list_assets(&self, repo: &str, release: &Release) -> Result<Vec<ReleaseAsset>>;

    fn delete_asset(&self, repo: &str, asset_id: u64) -> Result<()>;

    /// Uploads the artifact's bytes as a new asset named `name`.
    fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        artifact: &ExportArtifact,
    ) -> Result<ReleaseAsset>;
}
