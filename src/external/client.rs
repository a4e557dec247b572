//! Authenticated, traced wrapper around an [`ApiTransport`].
//!
//! Every call made through [`AuthenticatedApiClient::call_api`]:
//!
//! 1. lazily obtains a client-credentials token when OAuth2 is active and no
//!    token is held yet,
//! 2. runs inside an `External Api Call <client>` client span, injecting the
//!    trace context into the outbound headers when propagation is enabled,
//! 3. performs the transport call with nested instrumentation suppressed,
//! 4. on 401/403 forces one token refresh and retries exactly once.
//!
//! Any other failure is annotated on the span, logged and returned unchanged.

use std::sync::Arc;
use tracing::{debug, error, warn, Instrument};

use super::credentials::CredentialHolder;
use super::errors::{ApiError, ExternalCallError};
use super::propagation::TracePropagation;
use super::span::ExternalApiCallSpan;
use super::suppress::{is_instrumentation_suppressed, suppress_further_instrumentation};
use super::token::{ClientCredentialsProvider, TokenSource};
use super::transport::{ApiRequest, ApiResponse, ApiTransport};
use crate::config::CompanyConfig;
use crate::observability::ExternalApiMetrics;

pub struct AuthenticatedApiClient<T> {
    name: String,
    transport: T,
    credentials: CredentialHolder,
    token_source: Option<Arc<dyn TokenSource>>,
    propagation: TracePropagation,
    metrics: Arc<ExternalApiMetrics>,
}

impl<T: ApiTransport> AuthenticatedApiClient<T> {
    /// Unauthenticated, non-propagating client; configure with the `with_*` methods
    pub fn new(name: impl Into<String>, transport: T) -> Self {
        Self {
            name: name.into(),
            transport,
            credentials: CredentialHolder::new(),
            token_source: None,
            propagation: TracePropagation::disabled(),
            metrics: Arc::new(ExternalApiMetrics::new()),
        }
    }

    /// Client wired from the OAuth2 and tracing settings
    pub fn from_config(
        name: impl Into<String>,
        transport: T,
        http: reqwest::Client,
        config: &CompanyConfig,
    ) -> Result<Self, ExternalCallError> {
        let mut client = Self::new(name, transport)
            .with_propagation(TracePropagation::from_settings(&config.tracing));

        if let Some(provider) = ClientCredentialsProvider::from_settings(http, &config.oauth2)? {
            client = client.with_token_source(Arc::new(provider));
        }

        Ok(client)
    }

    pub fn with_credentials(mut self, credentials: CredentialHolder) -> Self {
        self.credentials = credentials;
        self
    }

    /// Enables OAuth2; without a token source calls go out unauthenticated
    pub fn with_token_source(mut self, token_source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(token_source);
        self
    }

    pub fn with_propagation(mut self, propagation: TracePropagation) -> Self {
        self.propagation = propagation;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn credentials(&self) -> &CredentialHolder {
        &self.credentials
    }

    pub fn metrics(&self) -> &ExternalApiMetrics {
        &self.metrics
    }

    pub fn oauth2_enabled(&self) -> bool {
        self.token_source.is_some()
    }

    /// Fetch a token if OAuth2 is enabled and none is held yet
    pub async fn acquire_token(&self) -> Result<(), ExternalCallError> {
        if self.token_source.is_none() || self.credentials.is_set().await {
            return Ok(());
        }

        debug!(client = %self.name, "OAuth2 enabled. Requesting access token.");
        self.refresh_token().await
    }

    /// Unconditionally fetch a new token and replace the held one
    pub async fn refresh_token(&self) -> Result<(), ExternalCallError> {
        let Some(token_source) = &self.token_source else {
            return Ok(());
        };

        self.metrics.record_token_fetch();
        let token = token_source.fetch_token().await?;
        self.credentials.replace(token).await;
        Ok(())
    }

    pub async fn call_api(&self, mut request: ApiRequest) -> Result<ApiResponse, ExternalCallError> {
        self.metrics.record_call();

        if let Err(err) = self.acquire_token().await {
            self.metrics.record_error();
            return Err(err);
        }

        let span = ExternalApiCallSpan::new(&self.name, &request.method, &request.resource_path);
        if self.propagation.is_enabled() && !is_instrumentation_suppressed() {
            self.propagation.inject_span(&span, &mut request.header_params);
        }

        let error = match self.attempt(&request).instrument(span.span.clone()).await {
            Ok(response) => {
                span.record_success();
                return Ok(response);
            }
            Err(error) => error,
        };

        if error.is_authorization_expired() && self.oauth2_enabled() {
            span.in_scope(|| {
                warn!(client = %self.name, api_exception = %error, "Access Denied. Token expired? Retrying.");
            });
            self.metrics.record_auth_retry();

            if let Err(err) = self.refresh_token().await {
                self.metrics.record_error();
                return Err(err);
            }

            let retried = self.attempt(&request).instrument(span.span.clone()).await;
            return match retried {
                Ok(response) => {
                    span.record_success();
                    Ok(response)
                }
                Err(error) => {
                    span.record_failure(&error);
                    self.metrics.record_error();
                    Err(error.into())
                }
            };
        }

        span.record_failure(&error);
        span.in_scope(|| {
            error!(client = %self.name, error = %error, "Could not call API.");
        });
        self.metrics.record_error();
        Err(error.into())
    }

    /// One transport call carrying the token held at this moment
    async fn attempt(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut request = request.clone();
        if let Some(token) = self.credentials.current().await {
            request
                .header_params
                .insert("Authorization".to_string(), token.bearer());
        }

        self.metrics.record_attempt();
        suppress_further_instrumentation(self.transport.call_api(&request)).await
    }
}
