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

//! In-memory stand-in for a hosted repository, with the same acceptance
//! rules as the real API: a file update must carry the current revision
//! marker, and a release cannot hold two assets with one name.

use crate::domain::entities::{CommitStatus, ExportArtifact};
use crate::domain::errors::{DeliveryStage, ExportError, Result};
use crate::ports::repository_port::{FileWrite, Release, ReleaseAsset, RepositoryPort};
use base64::{engine::general_purpose, Engine as _};
use std::collections::HashMap;
use std::sync::Mutex;

struct StoredRelease {
    release: Release,
    assets: Vec<(ReleaseAsset, Vec<u8>)>,
}

#[derive(Default)]
struct State {
    files: HashMap<String, (Vec<u8>, String)>,
    releases: Vec<StoredRelease>,
    next_id: u64,
    calls: usize,
    sent_shas: Vec<Option<String>>,
    fail_uploads: bool,
    race_on_lookup: Option<Vec<u8>>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct FakeRepository {
    state: Mutex<State>,
}

impl FakeRepository {
    /// Number of remote calls made so far.
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn file_content(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|(c, _)| c.clone())
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().unwrap().files.len()
    }

    /// Revision markers sent with each `put_file`, in order.
    pub fn sent_shas(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().sent_shas.clone()
    }

    /// Simulates another writer updating `path` behind our back.
    pub fn overwrite_file(&self, path: &str, content: &[u8]) {
        let mut state = self.state.lock().unwrap();
        let sha = format!("sha-{}", state.next_id());
        state.files.insert(path.to_string(), (content.to_vec(), sha));
    }

    pub fn release_count(&self) -> usize {
        self.state.lock().unwrap().releases.len()
    }

    pub fn asset_names(&self, tag: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .releases
            .iter()
            .filter(|r| r.release.tag == tag)
            .flat_map(|r| r.assets.iter().map(|(a, _)| a.name.clone()))
            .collect()
    }

    pub fn asset_content(&self, tag: &str, name: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .releases
            .iter()
            .filter(|r| r.release.tag == tag)
            .flat_map(|r| r.assets.iter())
            .find(|(a, _)| a.name == name)
            .map(|(_, c)| c.clone())
    }

    /// The next `file_sha` lookup is followed by a concurrent write of `content`.
    pub fn race_next_lookup(&self, content: &[u8]) {
        self.state.lock().unwrap().race_on_lookup = Some(content.to_vec());
    }

    pub fn fail_uploads(&self) {
        self.state.lock().unwrap().fail_uploads = true;
    }
}

impl RepositoryPort for FakeRepository {
    fn file_sha(&self, _repo: &str, path: &str, _branch: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        let sha = state.files.get(path).map(|(_, sha)| sha.clone());
        if let Some(content) = state.race_on_lookup.take() {
            let racing = format!("sha-{}", state.next_id());
            state.files.insert(path.to_string(), (content, racing));
        }
        Ok(sha)
    }

    fn put_file(&self, _repo: &str, write: &FileWrite<'_>) -> Result<CommitStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.sent_shas.push(write.sha.map(str::to_string));

        let content = general_purpose::STANDARD
            .decode(write.content)
            .map_err(|e| ExportError::delivery(DeliveryStage::Commit, 422, e.to_string()))?;
        let current = state.files.get(write.path).map(|(_, sha)| sha.clone());

        let status = match (current, write.sha) {
            (None, None) => CommitStatus::Created,
            (Some(cur), Some(sent)) if cur == sent => CommitStatus::Updated,
            (Some(_), None) => {
                return Err(ExportError::delivery(
                    DeliveryStage::Commit,
                    422,
                    "\"sha\" wasn't supplied.",
                ))
            }
            (_, Some(sent)) => {
                return Err(ExportError::delivery(
                    DeliveryStage::Commit,
                    409,
                    format!("{} does not match", sent),
                ))
            }
        };

        let sha = format!("sha-{}", state.next_id());
        state.files.insert(write.path.to_string(), (content, sha));
        Ok(status)
    }

    fn release_by_tag(&self, _repo: &str, tag: &str) -> Result<Option<Release>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        Ok(state
            .releases
            .iter()
            .find(|r| r.release.tag == tag)
            .map(|r| r.release.clone()))
    }

    fn create_release(&self, _repo: &str, tag: &str, _name: Option<&str>) -> Result<Release> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.releases.iter().any(|r| r.release.tag == tag) {
            return Err(ExportError::delivery(
                DeliveryStage::CreateRelease,
                422,
                "already_exists",
            ));
        }
        let id = state.next_id();
        let release = Release {
            id,
            tag: tag.to_string(),
            upload_url: format!("https://uploads.example/releases/{}/assets", id),
        };
        state.releases.push(StoredRelease {
            release: release.clone(),
            assets: Vec::new(),
        });
        Ok(release)
    }

    fn list_assets(&self, _repo: &str, release: &Release) -> Result<Vec<ReleaseAsset>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        Ok(state
            .releases
            .iter()
            .find(|r| r.release.id == release.id)
            .map(|r| r.assets.iter().map(|(a, _)| a.clone()).collect())
            .unwrap_or_default())
    }

    fn delete_asset(&self, _repo: &str, asset_id: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        for r in state.releases.iter_mut() {
            if let Some(pos) = r.assets.iter().position(|(a, _)| a.id == asset_id) {
                r.assets.remove(pos);
                return Ok(());
            }
        }
        Err(ExportError::delivery(DeliveryStage::DeleteAsset, 404, "Not Found"))
    }

    fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        artifact: &ExportArtifact,
    ) -> Result<ReleaseAsset> {
        let content = std::fs::read(&artifact.path)?;
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.fail_uploads {
            return Err(ExportError::delivery(DeliveryStage::Upload, 502, "Bad Gateway"));
        }
        let id = state.next_id();
        let stored = state
            .releases
            .iter_mut()
            .find(|r| r.release.id == release.id)
            .ok_or_else(|| ExportError::delivery(DeliveryStage::Upload, 404, "Not Found"))?;
        if stored.assets.iter().any(|(a, _)| a.name == name) {
            return Err(ExportError::delivery(
                DeliveryStage::Upload,
                422,
                "already_exists",
            ));
        }
        let asset = ReleaseAsset {
            id,
            name: name.to_string(),
        };
        stored.assets.push((asset.clone(), content));
        Ok(asset)
    }
}
