//! Authenticated HTTP client for the Lufthansa Open API
//!
//! Wraps reqwest::Client with bearer token injection and the
//! refresh-and-retry behaviour of [`AuthenticatedInvoker`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::ACCEPT;
use serde_json::Value;
use url::Url;

use super::invoker::{AuthenticatedInvoker, RefreshPolicy, RetryPolicy};
use crate::auth::{Credentials, OAuthExchange, TokenStore};
use crate::error::{ApiError, LhApiError};

pub const DEFAULT_BASE_URL: &str = "https://api.lufthansa.com/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Construction options besides the credentials.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Overrides [`DEFAULT_BASE_URL`]
    pub base_url: Option<String>,
    pub refresh_policy: RefreshPolicy,
    pub retry_policy: RetryPolicy,
    /// Per-request timeout of the HTTP transport, token requests included
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            refresh_policy: RefreshPolicy::default(),
            retry_policy: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct LhApiClient {
    http: reqwest::Client,
    base_url: Url,
    invoker: AuthenticatedInvoker,
}

impl LhApiClient {
    pub fn new(credentials: Credentials, options: ClientOptions) -> Result<Self, LhApiError> {
        let base = options
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        let base_url = Url::parse(base)
            .map_err(|e| LhApiError::Config(format!("invalid base URL {}: {}", base, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(LhApiError::Config(format!(
                "base URL {} cannot carry a path",
                base
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| LhApiError::Config(format!("failed to build HTTP client: {}", e)))?;

        let exchange = OAuthExchange::new(base, options.timeout)?;
        let store = Arc::new(TokenStore::new(credentials, Arc::new(exchange)));
        let invoker = AuthenticatedInvoker::new(store)
            .with_refresh_policy(options.refresh_policy)
            .with_retry_policy(options.retry_policy);

        tracing::debug!("API client ready for {}", base_url);
        Ok(Self {
            http,
            base_url,
            invoker,
        })
    }

    pub fn invoker(&self) -> &AuthenticatedInvoker {
        &self.invoker
    }

    /// Base URL with `segments` appended, each percent-encoded as needed.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Authenticated GET returning the JSON body.
    pub async fn get_json(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Value, LhApiError> {
        let url = self.endpoint(segments);
        let url = &url;

        self.invoker
            .invoke(|token| {
                tracing::debug!("GET {}", url);
                let request = self
                    .http
                    .get(url.clone())
                    .bearer_auth(token)
                    .header(ACCEPT, "application/json")
                    .query(query);
                async move {
                    let resp = request.send().await?;
                    let resp = check_response(resp).await?;
                    resp.json::<Value>()
                        .await
                        .map_err(|e| ApiError::Decode(e.to_string()))
                }
            })
            .await
    }
}

/// Turn non-success statuses into [`ApiError::Rejected`], keeping the body.
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}
