//! Token storage and lifecycle

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use super::{Credentials, EXPIRATION_BUFFER_MS};
use crate::error::{ApiError, LhApiError};

/// Source of the current time, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Token endpoint response before validation.
///
/// Both fields are optional so that incomplete responses reach
/// [`TokenStore`] and are rejected there as malformed.
#[derive(Debug, Clone, Default)]
pub struct TokenGrant {
    pub access_token: Option<String>,
    pub expires_in: Option<i64>,
}

/// Exchanges client credentials for an access token.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn exchange(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError>;
}

/// Access token with its buffered expiry
#[derive(Clone)]
pub struct AccessToken {
    token: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Returns `None` if the lifetime does not fit in a timestamp.
    pub fn new(token: String, issued_at: DateTime<Utc>, expires_in_secs: i64) -> Option<Self> {
        let expires_at = issued_at
            .checked_add_signed(Duration::try_seconds(expires_in_secs)?)?
            .checked_sub_signed(Duration::milliseconds(EXPIRATION_BUFFER_MS))?;
        Some(Self {
            token,
            issued_at,
            expires_at,
        })
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Token value handed to an operation, tagged with the refresh that produced it.
#[derive(Clone)]
pub struct BearerToken {
    value: String,
    generation: u64,
}

impl BearerToken {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct TokenState {
    token: Option<AccessToken>,
    /// Bumped on every successful refresh.
    generation: u64,
}

impl TokenState {
    fn bearer(&self) -> Option<BearerToken> {
        self.token.as_ref().map(|t| BearerToken {
            value: t.token.clone(),
            generation: self.generation,
        })
    }
}

/// Holds at most one access token and refreshes it through a [`CredentialExchange`].
///
/// The state lock is held for the whole exchange, so only one refresh is in
/// flight at a time; callers queued behind it reuse its result.
pub struct TokenStore {
    credentials: Credentials,
    exchange: Arc<dyn CredentialExchange>,
    clock: Arc<dyn Clock>,
    state: Mutex<TokenState>,
}

impl TokenStore {
    pub fn new(credentials: Credentials, exchange: Arc<dyn CredentialExchange>) -> Self {
        Self::with_clock(credentials, exchange, Arc::new(SystemClock))
    }

    pub fn with_clock(
        credentials: Credentials,
        exchange: Arc<dyn CredentialExchange>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credentials,
            exchange,
            clock,
            state: Mutex::new(TokenState::default()),
        }
    }

    /// Return the held token if still valid, otherwise refresh first.
    pub async fn ensure_valid(&self) -> Result<BearerToken, LhApiError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        if let Some(token) = state.token.as_ref() {
            if token.is_valid_at(now) {
                if let Some(bearer) = state.bearer() {
                    return Ok(bearer);
                }
            }
            tracing::debug!("Access token expired at {}, refreshing", token.expires_at);
        } else {
            tracing::debug!("No access token held yet, acquiring one");
        }
        self.refresh_locked(&mut state).await
    }

    /// Refresh unconditionally.
    pub async fn force_refresh(&self) -> Result<BearerToken, LhApiError> {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state).await
    }

    /// Refresh unless the token has already been replaced since `stale` was handed out.
    pub async fn force_refresh_after(&self, stale: &BearerToken) -> Result<BearerToken, LhApiError> {
        let mut state = self.state.lock().await;
        if state.generation != stale.generation {
            if let Some(bearer) = state.bearer() {
                tracing::debug!(
                    "Token already refreshed by another caller (generation {})",
                    bearer.generation
                );
                return Ok(bearer);
            }
        }
        self.refresh_locked(&mut state).await
    }

    /// Currently held token, valid or not. Never refreshes.
    pub async fn current(&self) -> Option<BearerToken> {
        self.state.lock().await.bearer()
    }

    /// Snapshot of the held token's timestamps.
    pub async fn access_token(&self) -> Option<AccessToken> {
        self.state.lock().await.token.clone()
    }

    async fn refresh_locked(&self, state: &mut TokenState) -> Result<BearerToken, LhApiError> {
        let issued_at = self.clock.now();
        let grant = self
            .exchange
            .exchange(&self.credentials)
            .await
            .map_err(|e| {
                tracing::warn!("Credential exchange failed: {}", e);
                LhApiError::exchange_failed(e)
            })?;

        let value = grant
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LhApiError::malformed_token("missing access_token"))?;
        let expires_in = grant
            .expires_in
            .ok_or_else(|| LhApiError::malformed_token("missing expires_in"))?;
        if expires_in <= 0 {
            return Err(LhApiError::malformed_token(&format!(
                "non-positive expires_in {}",
                expires_in
            )));
        }
        let token = AccessToken::new(value.clone(), issued_at, expires_in)
            .ok_or_else(|| LhApiError::malformed_token("expires_in out of range"))?;

        tracing::info!(
            "Access token acquired, valid until {}",
            token.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        state.generation += 1;
        state.token = Some(token);
        Ok(BearerToken {
            value,
            generation: state.generation,
        })
    }
}
