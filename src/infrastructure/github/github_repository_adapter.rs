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

//! Infrastructure adapter for the GitHub REST API (contents and releases).
//!
//! Every call is a single blocking request, except asset listing, which
//! follows `Link` pagination. Success is judged by the exact
//! status codes the API documents for each endpoint; anything else becomes
//! a `DeliveryError` carrying the status and the response body verbatim.
//! The token never appears in logs or error messages.

use crate::domain::entities::{CommitStatus, ExportArtifact};
use crate::domain::errors::{DeliveryStage, ExportError, Result};
use crate::ports::repository_port::{FileWrite, Release, ReleaseAsset, RepositoryPort};
use log::{debug, info};
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, LINK};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const CLIENT_USER_AGENT: &str = concat!("wh2repo/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";
const COMMITTER_NAME: &str = "automation";
const COMMITTER_EMAIL: &str = "actions@users.noreply.github.com";
const REQUEST_TIMEOUT_SECS: u64 = 600;
const PAGE_SIZE: &str = "100";

#[derive(Serialize)]
struct Committer {
    name: &'static str,
    email: &'static str,
}

#[derive(Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: &'a str,
    branch: &'a str,
    committer: Committer,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Serialize)]
struct CreateReleaseRequest<'a> {
    tag_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
}

#[derive(Deserialize)]
struct ReleaseResponse {
    id: u64,
    tag_name: String,
    upload_url: String,
}

impl From<ReleaseResponse> for Release {
    fn from(r: ReleaseResponse) -> Self {
        // "https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}"
        let upload_url = match r.upload_url.split_once('{') {
            Some((base, _)) => base.to_string(),
            None => r.upload_url,
        };
        Release {
            id: r.id,
            tag: r.tag_name,
            upload_url,
        }
    }
}

#[derive(Deserialize)]
struct AssetResponse {
    id: u64,
    name: String,
}

impl From<AssetResponse> for ReleaseAsset {
    fn from(a: AssetResponse) -> Self {
        ReleaseAsset {
            id: a.id,
            name: a.name,
        }
    }
}

pub struct GitHubRepositoryAdapter {
    http: Client,
    api_base: Url,
    token: SecretString,
}

impl GitHubRepositoryAdapter {
    pub fn new(api_base: &str, token: SecretString) -> Result<Self> {
        let api_base = Url::parse(api_base)
            .map_err(|e| {
                ExportError::ConfigError(format!("Invalid GitHub API URL '{}': {}", api_base, e))
            })?;
        if api_base.cannot_be_a_base() {
            return Err(ExportError::ConfigError(format!(
                "Invalid GitHub API URL '{}'",
                api_base
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let http = Client::builder()
            .user_agent(CLIENT_USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExportError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base,
            token,
        })
    }

    /// `{api_base}/repos/{owner}/{name}/{tail...}`, with each segment escaped.
    fn repo_url(&self, repo: &str, tail: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("repos")
                .extend(repo.split('/'))
                .extend(tail.iter().flat_map(|t| t.split('/')));
        }
        url
    }

    fn send(&self, stage: DeliveryStage, request: RequestBuilder) -> Result<Response> {
        request
            .bearer_auth(self.token.expose_secret())
            .send()
            .map_err(|e| ExportError::delivery(stage, 0, e.to_string()))
    }

    fn parse<T: DeserializeOwned>(stage: DeliveryStage, response: Response) -> Result<T> {
        let status = response.status().as_u16();
        response
            .json()
            .map_err(|e| {
                ExportError::delivery(stage, status, format!("unreadable response: {}", e))
            })
    }

    /// Target of the `rel="next"` entry of a `Link` header, if any.
    fn next_page(response: &Response) -> Option<String> {
        let link = response.headers().get(LINK)?.to_str().ok()?;
        link.split(',').find_map(|entry| {
            let (target, params) = entry.split_once(';')?;
            params
                .split(';')
                .any(|p| p.trim() == "rel=\"next\"")
                .then(|| target.trim().trim_start_matches('<').trim_end_matches('>').to_string())
        })
    }

    fn failure(stage: DeliveryStage, response: Response) -> ExportError {
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        ExportError::delivery(stage, status, body)
    }
}

impl RepositoryPort for GitHubRepositoryAdapter {
    fn file_sha(&self, repo: &str, path: &str, branch: &str) -> Result<Option<String>> {
        let mut url = self.repo_url(repo, &["contents", path]);
        url.query_pairs_mut().append_pair("ref", branch);

        let response = self.send(DeliveryStage::Lookup, self.http.get(url))?;
        debug!("GET contents/{} -> {}", path, response.status().as_u16());
        match response.status() {
            StatusCode::OK => {
                let body: ContentsResponse = Self::parse(DeliveryStage::Lookup, response)?;
                Ok(Some(body.sha))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(Self::failure(DeliveryStage::Lookup, response)),
        }
    }

    fn put_file(&self, repo: &str, write: &FileWrite<'_>) -> Result<CommitStatus> {
        let url = self.repo_url(repo, &["contents", write.path]);
        let body = PutContentsRequest {
            message: write.message,
            content: write.content,
            branch: write.branch,
            committer: Committer {
                name: COMMITTER_NAME,
                email: COMMITTER_EMAIL,
            },
            sha: write.sha,
        };

        let response = self.send(DeliveryStage::Commit, self.http.put(url).json(&body))?;
        info!("PUT contents/{} -> {}", write.path, response.status().as_u16());
        match response.status() {
            StatusCode::CREATED => Ok(CommitStatus::Created),
            StatusCode::OK => Ok(CommitStatus::Updated),
            _ => Err(Self::failure(DeliveryStage::Commit, response)),
        }
    }

    fn release_by_tag(&self, repo: &str, tag: &str) -> Result<Option<Release>> {
        let url = self.repo_url(repo, &["releases", "tags", tag]);

        let response = self.send(DeliveryStage::Lookup, self.http.get(url))?;
        debug!("GET releases/tags/{} -> {}", tag, response.status().as_u16());
        match response.status() {
            StatusCode::OK => {
                let body: ReleaseResponse = Self::parse(DeliveryStage::Lookup, response)?;
                Ok(Some(body.into()))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(Self::failure(DeliveryStage::Lookup, response)),
        }
    }

    fn create_release(&self, repo: &str, tag: &str, name: Option<&str>) -> Result<Release> {
        let url = self.repo_url(repo, &["releases"]);
        let body = CreateReleaseRequest {
            tag_name: tag,
            name,
        };

        let response = self.send(DeliveryStage::CreateRelease, self.http.post(url).json(&body))?;
        info!("POST releases ({}) -> {}", tag, response.status().as_u16());
        if response.status() != StatusCode::CREATED {
            return Err(Self::failure(DeliveryStage::CreateRelease, response));
        }
        let body: ReleaseResponse = Self::parse(DeliveryStage::CreateRelease, response)?;
        Ok(body.into())
    }

    fn list_assets(&self, repo: &str, release: &Release) -> Result<Vec<ReleaseAsset>> {
        let mut url = self.repo_url(repo, &["releases", &release.id.to_string(), "assets"]);
        url.query_pairs_mut().append_pair("per_page", PAGE_SIZE);

        let mut assets = Vec::new();
        let mut next = Some(url);
        let mut page = 0;
        while let Some(page_url) = next.take() {
            page += 1;
            let response = self.send(DeliveryStage::Lookup, self.http.get(page_url))?;
            debug!(
                "GET releases/{}/assets page {} -> {}",
                release.id,
                page,
                response.status().as_u16()
            );
            if response.status() != StatusCode::OK {
                return Err(Self::failure(DeliveryStage::Lookup, response));
            }
            // The token is only ever sent back to the configured API host.
            next = match Self::next_page(&response) {
                Some(link) => match Url::parse(&link) {
                    Ok(u) if u.origin() == self.api_base.origin() => Some(u),
                    _ => {
                        return Err(ExportError::delivery(
                            DeliveryStage::Lookup,
                            response.status().as_u16(),
                            format!("unexpected next page link '{}'", link),
                        ))
                    }
                },
                None => None,
            };
            let page: Vec<AssetResponse> = Self::parse(DeliveryStage::Lookup, response)?;
            assets.extend(page.into_iter().map(ReleaseAsset::from));
        }
        Ok(assets)
    }

    fn delete_asset(&self, repo: &str, asset_id: u64) -> Result<()> {
        let url = self.repo_url(repo, &["releases", "assets", &asset_id.to_string()]);

        let response = self.send(DeliveryStage::DeleteAsset, self.http.delete(url))?;
        info!("DELETE releases/assets/{} -> {}", asset_id, response.status().as_u16());
        if response.status() != StatusCode::NO_CONTENT {
            return Err(Self::failure(DeliveryStage::DeleteAsset, response));
        }
        Ok(())
    }

    fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        artifact: &ExportArtifact,
    ) -> Result<ReleaseAsset> {
        let mut url = Url::parse(&release.upload_url).map_err(|e| {
            ExportError::delivery(
                DeliveryStage::Upload,
                0,
                format!("bad upload URL '{}': {}", release.upload_url, e),
            )
        })?;
        url.query_pairs_mut().append_pair("name", name);

        let file = File::open(&artifact.path)?;
        let len = file.metadata()?.len();
        let request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(Body::sized(file, len));

        let response = self.send(DeliveryStage::Upload, request)?;
        info!("POST asset {} ({} bytes) -> {}", name, len, response.status().as_u16());
        if response.status() != StatusCode::CREATED {
            return Err(Self::failure(DeliveryStage::Upload, response));
        }
        let asset: AssetResponse = Self::parse(DeliveryStage::Upload, response)?;
        Ok(asset.into())
    }
}
