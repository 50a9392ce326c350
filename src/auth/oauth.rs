//! OAuth2 client credentials exchange against the API's token endpoint

use std::time::Duration;

use async_trait::async_trait;
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    TokenResponse, TokenUrl,
};

use super::tokens::{CredentialExchange, TokenGrant};
use super::{Credentials, GRANT_TYPE};
use crate::error::{ApiError, LhApiError};

type HttpError = oauth2::reqwest::Error<reqwest::Error>;
type OAuthRequestError = RequestTokenError<HttpError, BasicErrorResponse>;

/// Posts `client_id`, `client_secret` and `grant_type=client_credentials`
/// to `{base_url}/oauth/token`.
#[derive(Debug, Clone)]
pub struct OAuthExchange {
    auth_url: AuthUrl,
    token_url: TokenUrl,
    http: reqwest::Client,
}

impl OAuthExchange {
    /// `timeout` bounds the whole token request.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LhApiError> {
        let endpoint = format!("{}/oauth/token", base_url.trim_end_matches('/'));
        // The client credentials grant never visits the authorization URL,
        // but the oauth2 client requires one.
        let auth_url = AuthUrl::new(endpoint.clone())
            .map_err(|e| LhApiError::Config(format!("invalid token URL {}: {}", endpoint, e)))?;
        let token_url = TokenUrl::new(endpoint.clone())
            .map_err(|e| LhApiError::Config(format!("invalid token URL {}: {}", endpoint, e)))?;
        // Redirects are not followed, the token endpoint must answer directly.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| LhApiError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            auth_url,
            token_url,
            http,
        })
    }

    pub fn token_url(&self) -> &str {
        self.token_url.as_str()
    }

    fn build_client(&self, credentials: &Credentials) -> BasicClient {
        BasicClient::new(
            ClientId::new(credentials.client_id().to_string()),
            Some(ClientSecret::new(credentials.client_secret().to_string())),
            self.auth_url.clone(),
            Some(self.token_url.clone()),
        )
        .set_auth_type(AuthType::RequestBody)
    }

    /// Run a request built by the oauth2 client on our own reqwest client.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = self
            .http
            .request(request.method, request.url.as_str())
            .body(request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_bytes());
        }

        let response = builder.send().await.map_err(HttpError::Reqwest)?;
        let status_code = response.status();
        let headers = response.headers().to_owned();
        let body = response.bytes().await.map_err(HttpError::Reqwest)?;
        Ok(HttpResponse {
            status_code,
            headers,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl CredentialExchange for OAuthExchange {
    async fn exchange(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError> {
        tracing::debug!("Requesting {} access token from {}", GRANT_TYPE, self.token_url());

        let token_response = self
            .build_client(credentials)
            .exchange_client_credentials()
            .request_async(|request| self.send(request))
            .await
            .map_err(classify)?;

        Ok(TokenGrant {
            access_token: Some(token_response.access_token().secret().to_string()),
            expires_in: token_response
                .expires_in()
                .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX)),
        })
    }
}

fn classify(err: OAuthRequestError) -> ApiError {
    match err {
        RequestTokenError::ServerResponse(resp) => ApiError::TokenEndpoint(resp.to_string()),
        RequestTokenError::Request(oauth2::reqwest::Error::Reqwest(e)) => ApiError::from(e),
        RequestTokenError::Request(other) => ApiError::Transport(other.to_string()),
        RequestTokenError::Parse(e, _) => ApiError::Decode(e.to_string()),
        RequestTokenError::Other(msg) => ApiError::TokenEndpoint(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn creds() -> Credentials {
        Credentials::new("abc", "xyz").unwrap()
    }

    #[test]
    fn test_token_url_from_base() {
        let exchange = OAuthExchange::new("https://api.lufthansa.com/v1/", TIMEOUT).unwrap();
        assert_eq!(exchange.token_url(), "https://api.lufthansa.com/v1/oauth/token");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            OAuthExchange::new("not a url", TIMEOUT),
            Err(LhApiError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_sends_credentials_in_form_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/oauth/token")
                .body_includes(format!("grant_type={}", GRANT_TYPE))
                .body_includes("client_id=abc")
                .body_includes("client_secret=xyz");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"access_token":"tok1","token_type":"bearer","expires_in":129600}"#);
        });

        let exchange = OAuthExchange::new(&server.base_url(), TIMEOUT).unwrap();
        let grant = exchange.exchange(&creds()).await.unwrap();

        assert_eq!(grant.access_token.as_deref(), Some("tok1"));
        assert_eq!(grant.expires_in, Some(129600));
        mock.assert();
    }

    #[tokio::test]
    async fn test_missing_expires_in_passes_through() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"access_token":"tok1","token_type":"bearer"}"#);
        });

        let exchange = OAuthExchange::new(&server.base_url(), TIMEOUT).unwrap();
        let grant = exchange.exchange(&creds()).await.unwrap();

        assert_eq!(grant.access_token.as_deref(), Some("tok1"));
        assert!(grant.expires_in.is_none());
    }

    #[tokio::test]
    async fn test_oauth_error_document() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(401)
                .header("content-type", "application/json")
                .body(r#"{"error":"invalid_client"}"#);
        });

        let exchange = OAuthExchange::new(&server.base_url(), TIMEOUT).unwrap();
        let err = exchange.exchange(&creds()).await.unwrap_err();

        assert!(
            matches!(err, ApiError::TokenEndpoint(ref msg) if msg.contains("invalid_client")),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let exchange = OAuthExchange::new("http://127.0.0.1:9", TIMEOUT).unwrap();
        let err = exchange.exchange(&creds()).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_stalled_token_endpoint_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"access_token":"tok1","token_type":"bearer","expires_in":129600}"#)
                .delay(Duration::from_secs(3));
        });

        let exchange = OAuthExchange::new(&server.base_url(), Duration::from_millis(500)).unwrap();
        let started = std::time::Instant::now();
        let err = exchange.exchange(&creds()).await.unwrap_err();

        assert!(matches!(err, ApiError::Transport(_)), "unexpected error: {err}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
