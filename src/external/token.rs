use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::credentials::AccessToken;
use super::errors::ExternalCallError;
use crate::config::OAuth2Settings;

/// Upper bound for one token endpoint round trip
pub const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of fresh access tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Always performs a new request; caching is the caller's concern
    async fn fetch_token(&self) -> Result<AccessToken, ExternalCallError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// OAuth2 client-credentials grant against a token endpoint
#[derive(Clone)]
pub struct ClientCredentialsProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl fmt::Debug for ClientCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentialsProvider")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl ClientCredentialsProvider {
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Provider for the configured resource server, or `None` when OAuth2 is inactive
    pub fn from_settings(
        http: reqwest::Client,
        settings: &OAuth2Settings,
    ) -> Result<Option<Self>, ExternalCallError> {
        if !settings.oauth2_active {
            return Ok(None);
        }
        if settings.oauth2_token_url.is_empty() {
            return Err(ExternalCallError::MissingOAuth2Setting("OAUTH2_TOKEN_URL"));
        }

        Ok(Some(Self::new(
            http,
            &settings.oauth2_token_url,
            &settings.oauth2_resource_server_id,
            &settings.oauth2_resource_server_secret,
        )))
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsProvider {
    async fn fetch_token(&self) -> Result<AccessToken, ExternalCallError> {
        debug!(token_url = %self.token_url, "Requesting client credentials token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[("grant_type", "client_credentials")])
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(ExternalCallError::TokenRequest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExternalCallError::TokenAcquisitionFailed { status, body });
        }

        // Client credentials never come with a refresh token, only access_token matters
        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|_| ExternalCallError::TokenResponseInvalid)?;

        payload
            .access_token
            .map(AccessToken::new)
            .ok_or(ExternalCallError::TokenResponseInvalid)
    }
}
