//! GitHub contents API uploader.
//!
//! API docs: https://docs.github.com/en/rest/repos/contents
//! Flow: GET the file for its blob `sha` (404 means create), then PUT the
//! base64 content with that `sha`.
//! Auth: `Authorization: token {token}`.

use anyhow::Context;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::ArtifactSync;
use crate::config::{AppConfig, SyncConfig};
use crate::types::EngineError;

const API_BASE: &str = "https://api.github.com";
const STORE_NAME: &str = "github";

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct GitHubSync {
    http: Client,
    base_url: String,
    owner: String,
    repo: String,
    branch: String,
}

impl GitHubSync {
    pub fn new(token: &str, owner: String, repo: String, branch: String) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));
        let mut auth = HeaderValue::from_str(&format!("token {token}"))
            .context("GitHub token is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("propedge/0.1.0")
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client for GitHub")?;

        Ok(Self {
            http,
            base_url: API_BASE.to_string(),
            owner,
            repo,
            branch,
        })
    }

    /// Build from `[sync]`, resolving the token and repo from the env.
    pub fn from_config(cfg: &SyncConfig) -> anyhow::Result<Self> {
        let token = AppConfig::resolve_env(&cfg.token_env)?;
        let owner = AppConfig::resolve_env(&cfg.owner_env)?;
        let repo = AppConfig::resolve_env(&cfg.repo_env)?;
        Self::new(&token, owner, repo, cfg.branch.clone())
    }

    fn contents_url(&self, remote_path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_url,
            self.owner,
            self.repo,
            remote_path.trim_start_matches('/')
        )
    }

    /// The current blob sha, or None when the file does not exist yet.
    async fn existing_sha(&self, url: &str, remote_path: &str) -> Result<Option<String>, EngineError> {
        let resp = self
            .http
            .get(url)
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await
            .map_err(|e| sync_error(remote_path, format!("lookup request failed: {e}")))?;

        match resp.status() {
            StatusCode::OK => {
                let body: ContentsResponse = resp
                    .json()
                    .await
                    .map_err(|e| sync_error(remote_path, format!("unreadable lookup response: {e}")))?;
                debug!(path = remote_path, sha = %body.sha, "Found existing file, will update it");
                Ok(Some(body.sha))
            }
            StatusCode::NOT_FOUND => {
                debug!(path = remote_path, "File doesn't exist, will create it");
                Ok(None)
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(sync_error(remote_path, format!("lookup returned {status}: {body}")))
            }
        }
    }
}

fn sync_error(target: &str, message: String) -> EngineError {
    EngineError::UpstreamSync { target: target.to_string(), message }
}

/// Commit message for an upload of `remote_path`.
fn commit_message(remote_path: &str) -> String {
    let file = remote_path.rsplit('/').next().unwrap_or(remote_path);
    format!("Update {file}")
}

#[async_trait]
impl ArtifactSync for GitHubSync {
    async fn upload(&self, remote_path: &str, content: &str) -> Result<(), EngineError> {
        let url = self.contents_url(remote_path);
        let sha = self.existing_sha(&url, remote_path).await?;

        let request = PutContentsRequest {
            message: commit_message(remote_path),
            content: STANDARD.encode(content.as_bytes()),
            branch: &self.branch,
            sha,
        };

        let resp = self
            .http
            .put(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| sync_error(remote_path, format!("upload request failed: {e}")))?;

        let status = resp.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            info!(
                repo = format!("{}/{}", self.owner, self.repo),
                path = remote_path,
                bytes = content.len(),
                "Uploaded artifact"
            );
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(sync_error(remote_path, format!("upload returned {status}: {body}")))
        }
    }

    fn name(&self) -> &str {
        STORE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
