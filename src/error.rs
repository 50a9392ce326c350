//! Error types for remote calls and the authenticated client

use thiserror::Error;

/// Failure of a single remote call (token exchange or API operation).
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The server answered, but with a non-success status.
    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The request never completed (connect, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// A response arrived but its body could not be read or parsed.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// The token endpoint answered with an OAuth2 error document.
    #[error("token endpoint error: {0}")]
    TokenEndpoint(String),
}

impl ApiError {
    /// True for `401 Unauthorized` and `403 Forbidden` rejections.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, ApiError::Rejected { status: 401 | 403, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            ApiError::Rejected {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() || err.is_body() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Errors surfaced by the authenticated client.
///
/// Raw [`ApiError`]s never reach callers of
/// [`AuthenticatedInvoker::invoke`](crate::api::invoker::AuthenticatedInvoker::invoke):
/// they are wrapped in either `Authentication` or `Operation`.
#[derive(Debug, Error)]
pub enum LhApiError {
    /// Credential exchange failed or returned an unusable token.
    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
        #[source]
        source: Option<ApiError>,
    },

    /// The operation failed, including after a token refresh and retry.
    #[error("could not execute the operation")]
    Operation {
        #[source]
        source: ApiError,
    },

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("client configuration error: {0}")]
    Config(String),
}

impl LhApiError {
    pub(crate) fn exchange_failed(source: ApiError) -> Self {
        LhApiError::Authentication {
            message: "error refreshing the access token".to_string(),
            source: Some(source),
        }
    }

    pub(crate) fn malformed_token(detail: &str) -> Self {
        LhApiError::Authentication {
            message: format!("malformed token response ({})", detail),
            source: None,
        }
    }
}
