//! Staging client construction.

use crate::auth::USER_AGENT;
use crate::error::StagingError;
use crate::retry::Backoff;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::time::Duration;
use url::Url;

/// Configuration for the staging destination.
#[derive(Debug, Clone)]
pub struct StagingConfig {
    /// API base URL of the staging service.
    pub base_url: Url,
    /// Workspace containing the target environment.
    pub workspace_id: String,
    /// Environment whose staging area receives artifacts.
    pub environment_id: String,
    /// Bearer token; required, its absence is a construction error.
    pub token: Option<String>,
    /// Retry policy for uploads.
    pub backoff: Backoff,
    /// Interval between publish-operation polls.
    pub poll_interval: Duration,
    /// Wall-clock bound on waiting for a publish operation.
    pub publish_timeout: Duration,
}

impl StagingConfig {
    /// Config with the default retry, polling, and timeout knobs.
    pub fn new(
        base_url: Url,
        workspace_id: impl Into<String>,
        environment_id: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            base_url,
            workspace_id: workspace_id.into(),
            environment_id: environment_id.into(),
            token,
            backoff: Backoff::default(),
            poll_interval: Duration::from_secs(10),
            publish_timeout: Duration::from_secs(300),
        }
    }
}

/// Authenticated client for one environment's staging area.
#[derive(Debug, Clone)]
pub struct StagingClient {
    pub(super) base_url: Url,
    pub(super) workspace_id: String,
    pub(super) environment_id: String,
    pub(super) client: reqwest::Client,
    pub(super) backoff: Backoff,
    pub(super) poll_interval: Duration,
    pub(super) publish_timeout: Duration,
}

impl StagingClient {
    /// Construct the client.
    ///
    /// The bearer token is resolved here; a missing credential fails
    /// construction rather than surfacing later as a runtime check.
    pub fn new(config: StagingConfig) -> std::result::Result<Self, StagingError> {
        let token = config.token.ok_or(StagingError::MissingCredential)?;

        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            StagingError::ClientConstruction {
                reason: "staging token is not a valid header value".to_string(),
            }
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| StagingError::ClientConstruction {
                reason: e.to_string(),
            })?;

        Ok(Self {
            base_url: config.base_url,
            workspace_id: config.workspace_id,
            environment_id: config.environment_id,
            client,
            backoff: config.backoff,
            poll_interval: config.poll_interval,
            publish_timeout: config.publish_timeout,
        })
    }

    /// Workspace this client targets.
    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// Environment this client targets.
    pub fn environment_id(&self) -> &str {
        &self.environment_id
    }

    pub(super) fn endpoint(&self, suffix: &str) -> String {
        let base = self.base_url.to_string();
        let base = base.trim_end_matches('/');
        format!(
            "{base}/workspaces/{}/environments/{}/{suffix}",
            self.workspace_id, self.environment_id
        )
    }

    pub(super) fn operation_endpoint(&self, operation_id: &str) -> String {
        let base = self.base_url.to_string();
        let base = base.trim_end_matches('/');
        format!("{base}/operations/{operation_id}")
    }
}
