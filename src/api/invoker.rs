//! Authenticated execution of remote operations
//!
//! Every call runs under a bearer token from the [`TokenStore`]. If the call
//! fails, the token is assumed stale: it is force-refreshed and the call is
//! repeated exactly once.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::{BearerToken, TokenStore};
use crate::error::{ApiError, LhApiError};

/// When to check token expiry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshPolicy {
    /// Refresh before the call once the buffered expiry has passed.
    #[default]
    Proactive,
    /// Use whatever token is held and only refresh after a failed call.
    /// A token is still acquired up front if none has ever been held.
    Reactive,
}

/// Which failures trigger a refresh and retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryPolicy {
    /// Any failure, without looking at its cause.
    #[default]
    Blind,
    /// Only `401`/`403` rejections.
    AuthRejections,
}

pub struct AuthenticatedInvoker {
    store: Arc<TokenStore>,
    refresh_policy: RefreshPolicy,
    retry_policy: RetryPolicy,
}

impl AuthenticatedInvoker {
    pub fn new(store: Arc<TokenStore>) -> Self {
        Self {
            store,
            refresh_policy: RefreshPolicy::default(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn token_store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Run `operation` with a bearer token, retrying once after a forced refresh.
    ///
    /// `operation` receives the token string and is called at most twice.
    /// Token acquisition failures surface as [`LhApiError::Authentication`];
    /// a failed operation surfaces as [`LhApiError::Operation`] carrying the
    /// cause of the last attempt.
    pub async fn invoke<T, F, Fut>(&self, operation: F) -> Result<T, LhApiError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let token = self.initial_token().await?;

        let first_err = match operation(token.value().to_string()).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !self.should_retry(&first_err) {
            tracing::debug!("Operation failed, not retrying: {}", first_err);
            return Err(LhApiError::Operation { source: first_err });
        }

        tracing::warn!(
            "Operation failed with token generation {} ({}), refreshing and retrying",
            token.generation(),
            first_err
        );
        let token = self.store.force_refresh_after(&token).await?;

        operation(token.value().to_string())
            .await
            .map_err(|source| LhApiError::Operation { source })
    }

    async fn initial_token(&self) -> Result<BearerToken, LhApiError> {
        match self.refresh_policy {
            RefreshPolicy::Proactive => self.store.ensure_valid().await,
            RefreshPolicy::Reactive => match self.store.current().await {
                Some(token) => Ok(token),
                None => self.store.ensure_valid().await,
            },
        }
    }

    fn should_retry(&self, err: &ApiError) -> bool {
        match self.retry_policy {
            RetryPolicy::Blind => true,
            RetryPolicy::AuthRejections => err.is_auth_rejection(),
        }
    }
}
