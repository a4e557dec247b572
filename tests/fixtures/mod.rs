//! Shared wiremock fixtures for the integration tests
//!
//! One mock server plays both the OAuth2 authorization server (`/oauth/token`)
//! and the resource API behind it.

#![allow(dead_code)]

use company_orchestrator::config::CompanyConfig;
use company_orchestrator::{AuthenticatedApiClient, HttpTransport};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "company-tenant";
pub const CLIENT_SECRET: &str = "0042-secret";
pub const TOKEN_PATH: &str = "/oauth/token";

pub struct OrchestratorMock {
    pub server: MockServer,
}

impl OrchestratorMock {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn token_url(&self) -> String {
        format!("{}{}", self.server.uri(), TOKEN_PATH)
    }

    fn token_request() -> wiremock::MockBuilder {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(basic_auth(CLIENT_ID, CLIENT_SECRET))
            .and(body_string_contains("grant_type=client_credentials"))
    }

    /// Token endpoint handing out `token` exactly `times` times
    pub async fn mock_token(&self, token: &str, times: u64) {
        Self::token_request()
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token,
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .up_to_n_times(times)
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Token endpoint rejecting the client credentials
    pub async fn mock_token_rejected(&self, status: u16, body: &str) {
        Self::token_request()
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Fails the test on drop if the token endpoint is hit at all
    pub async fn forbid_token_requests(&self) {
        Mock::given(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    pub fn config(&self, oauth2_active: bool, tracing_enabled: bool) -> CompanyConfig {
        let mut config = CompanyConfig::default();
        config.oauth2.oauth2_active = oauth2_active;
        config.oauth2.oauth2_token_url = self.token_url();
        config.oauth2.oauth2_resource_server_id = CLIENT_ID.to_string();
        config.oauth2.oauth2_resource_server_secret = CLIENT_SECRET.to_string();
        config.tracing.tracing_enabled = tracing_enabled;
        config.external_services.orchestrator_uri = self.uri();
        config
    }

    pub fn client(&self, oauth2_active: bool) -> AuthenticatedApiClient<HttpTransport> {
        self.client_with(&self.config(oauth2_active, false))
    }

    pub fn client_with(&self, config: &CompanyConfig) -> AuthenticatedApiClient<HttpTransport> {
        let http = reqwest::Client::new();
        let transport = HttpTransport::new(http.clone(), &config.external_services.orchestrator_uri);
        AuthenticatedApiClient::from_config("orchestrator", transport, http, config)
            .expect("client from config")
    }
}
