//! ezpass HTTP client.
//!
//! One lookup is one `GET` against the configured base URL, raced against the
//! client's deadline. Status codes map onto [`LookupError`] as follows:
//!
//! - `200` decodes the body into a [`Pass`]
//! - `401` is `Unauthorized`
//! - `404` is `NotFound`
//! - anything else, and any transport or decode failure, is `Unknown`
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::error::{LookupError, UnknownCause};
use crate::services::ezpass::{deadline, pass::Pass, urls};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(50);
/// How long a call the caller gave up on may keep its connection.
pub const DEFAULT_ABANDON_AFTER: Duration = Duration::from_secs(10);

/// Connection settings for one [`EzpassClient`].
///
/// Each client owns its copy, so clients pointed at different services (or
/// at different fake services in tests) never share state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub abandon_after: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            abandon_after: DEFAULT_ABANDON_AFTER,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_abandon_after(mut self, abandon_after: Duration) -> Self {
        self.abandon_after = abandon_after;
        self
    }
}

/// Anything that can answer "who owns this token" questions.
///
/// The middleware depends on this trait rather than on [`EzpassClient`]
/// directly.
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    async fn lookup_user(&self, token: &str) -> Result<Pass, LookupError>;

    // NotFound means the token is valid but the user is not in the group.
    async fn lookup_membership(&self, token: &str, group_id: &str) -> Result<Pass, LookupError>;
}

#[derive(Debug, Clone)]
pub struct EzpassClient {
    http: Client,
    config: ClientConfig,
}

impl EzpassClient {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().build()?;
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: ClientConfig, http: Client) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn get(&self, url: String) -> Result<Pass, LookupError> {
        let http = self.http.clone();
        deadline::race(
            self.config.timeout,
            self.config.abandon_after,
            perform(http, url),
        )
        .await
    }
}

#[async_trait]
impl Authenticator for EzpassClient {
    async fn lookup_user(&self, token: &str) -> Result<Pass, LookupError> {
        let mut pass = self.get(urls::user_url(&self.config.base_url, token)).await?;
        // A user lookup never carries membership, whatever the remote sent.
        pass.membership = None;
        Ok(pass)
    }

    async fn lookup_membership(&self, token: &str, group_id: &str) -> Result<Pass, LookupError> {
        self.get(urls::group_url(&self.config.base_url, token, group_id))
            .await
    }
}

/// Issue one `GET` and classify the response.
///
/// The response is owned by this function: every return path either reads
/// the body to the end or drops it, so the connection is released even when
/// the caller has already given up on the result.
pub(crate) async fn perform(http: Client, url: String) -> Result<Pass, LookupError> {
    let response = http.get(url).send().await?;
    let status = response.status();

    match status {
        StatusCode::OK => {
            let body = response.bytes().await?;
            Ok(Pass::from_slice(&body)?)
        }
        StatusCode::NOT_FOUND => {
            drain(response).await;
            Err(LookupError::NotFound)
        }
        StatusCode::UNAUTHORIZED => {
            drain(response).await;
            Err(LookupError::Unauthorized)
        }
        other => {
            drain(response).await;
            tracing::debug!(status = %other, "unexpected ezpass status");
            Err(LookupError::Unknown(UnknownCause::Status(other)))
        }
    }
}

// Chunks are discarded as they arrive; the body is never held whole.
async fn drain(mut response: reqwest::Response) {
    loop {
        match response.chunk().await {
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(error = %err.without_url(), "failed to drain ezpass response");
                break;
            }
        }
    }
}
