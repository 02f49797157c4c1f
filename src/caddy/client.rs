use std::fmt;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::AdminError;

/// Every admin API request gets one attempt bounded by this timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body returned to the agent when Caddy refuses a new configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaddyError {
    pub status_code: u16,
    pub message: String,
}

/// Result of `POST /load` once Caddy has answered.
///
/// A request that never got an answer is reported as `Err(AdminError::Network)`
/// by [`AdminClient::load_config`], which makes the three outcomes (applied,
/// rejected, unreachable) distinguishable at the type level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { body: String },
    Rejected(CaddyError),
}

/// A non-fatal diagnostic emitted by one of Caddy's config adapters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AdaptWarning {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u64,
    #[serde(default)]
    pub directive: String,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for AdaptWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)?;
        if !self.directive.is_empty() {
            write!(f, " ({})", self.directive)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Response body of Caddy's `POST /adapt`.
#[derive(Debug, Clone, Deserialize)]
pub struct AdaptResponse {
    #[serde(default)]
    pub warnings: Vec<AdaptWarning>,
    pub result: serde_json::Value,
}

/// Thin client over the Caddy admin API. Cheap to share: the inner
/// `reqwest::Client` pools connections and is safe to use concurrently.
#[derive(Debug, Clone)]
pub struct AdminClient {
    client: Client,
    base_url: String,
}

impl AdminClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AdminError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, AdminError> {
        let url = format!("{}{}", self.base_url, path);
        Url::parse(&url).map_err(|source| AdminError::InvalidUrl { url, source })
    }

    /// Fetch the currently running configuration as JSON text.
    pub async fn get_config(&self) -> Result<String, AdminError> {
        let url = self.endpoint("/config/")?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AdminError::Status {
                operation: "get Caddy configuration",
                status: status.to_string(),
            });
        }

        let body = response.text().await?;
        // An empty body means nothing is loaded. Caddy also answers `null`
        // when it has never been given a config, so that counts too.
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Err(AdminError::NoConfigLoaded);
        }

        Ok(body)
    }

    /// Replace the running configuration.
    pub async fn load_config(&self, json_config: &str) -> Result<LoadOutcome, AdminError> {
        let url = self.endpoint("/load")?;
        debug!("POST {} ({} bytes)", url, json_config.len());

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(json_config.to_owned())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            warn!("Caddy rejected new configuration: {}", status);
            return Ok(LoadOutcome::Rejected(CaddyError {
                status_code: status.as_u16(),
                message: body,
            }));
        }

        Ok(LoadOutcome::Applied { body })
    }

    /// Health of every reverse proxy upstream Caddy knows about.
    pub async fn upstream_statuses(&self) -> Result<String, AdminError> {
        let url = self.endpoint("/reverse_proxy/upstreams")?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AdminError::Status {
                operation: "get upstream statuses",
                status: status.to_string(),
            });
        }

        Ok(response.text().await?)
    }

    /// Run one of Caddy's own config adapters on `body`. The adapter is picked
    /// by Caddy from the media type, e.g. `text/caddyfile`.
    pub async fn adapt(&self, content_type: &str, body: &[u8]) -> Result<AdaptResponse, AdminError> {
        let url = self.endpoint("/adapt")?;
        debug!("POST {} as {}", url, content_type);

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .header(ACCEPT, "application/json")
            .body(body.to_vec())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status != StatusCode::OK {
            return Err(AdminError::Status {
                operation: "adapt configuration",
                status: format!("{}: {}", status, error_message(&text)),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// Caddy reports failures as `{"error": "..."}`; fall back to the raw body.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.trim().to_string(),
    }
}
