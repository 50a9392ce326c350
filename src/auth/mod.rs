//! Authentication module for the Lufthansa Open API
//!
//! Implements the OAuth2 client credentials grant and keeps the resulting
//! bearer token fresh for the API client.

pub mod oauth;
pub mod tokens;

use std::fmt;

pub use oauth::OAuthExchange;
pub use tokens::{BearerToken, TokenStore};

use crate::error::LhApiError;

/// OAuth2 grant type sent to the token endpoint
pub const GRANT_TYPE: &str = "client_credentials";

/// Tokens are treated as expired this long before the server says they are (15 minutes)
pub const EXPIRATION_BUFFER_MS: i64 = 15 * 60 * 1000;

/// Client id/secret pair registered with the API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    /// Both values are required; empty or whitespace-only values are rejected.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, LhApiError> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.trim().is_empty() {
            return Err(LhApiError::InvalidCredentials(
                "client id must not be empty".to_string(),
            ));
        }
        if client_secret.trim().is_empty() {
            return Err(LhApiError::InvalidCredentials(
                "client secret must not be empty".to_string(),
            ));
        }
        Ok(Self {
            client_id,
            client_secret,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
