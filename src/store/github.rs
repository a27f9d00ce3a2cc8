//! GitHub contents API store
//!
//! Reads `GET /repos/{owner}/{repo}/contents/{path}?ref={branch}` and writes
//! with `PUT` on the same URL. The blob `sha` from the read is the version
//! token; GitHub rejects a write whose `sha` is stale.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{DocumentStore, Snapshot};
use crate::document;
use crate::error::{Result, StoreError};
use crate::record::Record;

/// Contents API location and credentials
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// API base URL
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    /// File path inside the repository
    pub path: String,
    pub branch: String,
    /// Personal access token; anonymous when absent
    pub token: Option<String>,
    /// Commit message used for every write
    pub commit_message: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            path: "Database.json".to_string(),
            branch: "main".to_string(),
            token: None,
            commit_message: "Update users via Admin Panel".to_string(),
            timeout_secs: 30,
        }
    }
}

impl GithubConfig {
    /// Full contents URL for the document
    pub fn contents_url(&self) -> String {
        let path = self
            .path
            .trim_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            path
        )
    }
}

/// Body of a contents read
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
    sha: String,
}

/// Body of a contents write
#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

pub struct GithubStore {
    config: GithubConfig,
    client: Client,
    url: String,
}

impl GithubStore {
    /// Build a store; fails if the token is not a valid header value
    pub fn new(config: GithubConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        if let Some(ref token) = config.token {
            let value = header::HeaderValue::from_str(&format!("token {}", token))
                .map_err(|e| StoreError::Config(format!("invalid token: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("license-console/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let url = config.contents_url();
        info!(url = %url, branch = %config.branch, "GitHub store configured");

        Ok(Self {
            config,
            client,
            url,
        })
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => StoreError::NotFound(self.config.path.clone()),
            StatusCode::CONFLICT => StoreError::Conflict(message),
            StatusCode::UNPROCESSABLE_ENTITY if message.contains("sha") => {
                StoreError::Conflict(message)
            }
            _ => StoreError::Server {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl DocumentStore for GithubStore {
    async fn load(&self) -> Result<Snapshot> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await?;
        let response = self.check_status(response).await?;
        let body: ContentsResponse = response.json().await?;

        if let Some(encoding) = body.encoding.as_deref() {
            if encoding != "base64" {
                return Err(StoreError::InvalidResponse(format!(
                    "unsupported content encoding: {}",
                    encoding
                )));
            }
        }

        let records = document::decode(&body.content)?;
        debug!(count = records.len(), sha = %body.sha, "Fetched document");

        Ok(Snapshot {
            records,
            version: Some(body.sha),
        })
    }

    async fn commit(&self, records: &[Record], version: Option<&str>) -> Result<()> {
        let request = CommitRequest {
            message: &self.config.commit_message,
            content: document::encode(records)?,
            branch: &self.config.branch,
            sha: version,
        };

        let response = self.client.put(&self.url).json(&request).send().await?;
        self.check_status(response).await?;

        debug!(count = records.len(), base = ?version, "Committed document");
        Ok(())
    }
}
