//! The low-level call interface of an external REST API client.
//!
//! [`ApiTransport`] is the seam the authenticated wrapper decorates. It takes
//! the same inputs a generated API client's `call_api` takes (resource path,
//! method, path/query/header parameters and an optional body) and yields
//! either the response or an [`ApiError`] exposing status and reason.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug_span, Instrument};

use super::errors::ApiError;
use super::suppress::is_instrumentation_suppressed;

const PATH_PARAM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// One outbound API call
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Path relative to the transport's base URL, may contain `{name}` placeholders
    pub resource_path: String,
    pub method: Method,
    pub path_params: HashMap<String, String>,
    pub query_params: Vec<(String, String)>,
    pub header_params: HashMap<String, String>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, resource_path: impl Into<String>) -> Self {
        Self {
            resource_path: resource_path.into(),
            method,
            path_params: HashMap::new(),
            query_params: Vec::new(),
            header_params: HashMap::new(),
            body: None,
        }
    }

    pub fn get(resource_path: impl Into<String>) -> Self {
        Self::new(Method::GET, resource_path)
    }

    pub fn post(resource_path: impl Into<String>) -> Self {
        Self::new(Method::POST, resource_path)
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.path_params.insert(name.into(), value.to_string());
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query_params.push((name.into(), value.to_string()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header_params.insert(name.into(), value.into());
        self
    }

    pub fn with_json_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Resource path with every `{name}` placeholder replaced by its encoded path parameter
    pub fn expanded_path(&self) -> String {
        self.path_params
            .iter()
            .fold(self.resource_path.clone(), |path, (name, value)| {
                let encoded = utf8_percent_encode(value, PATH_PARAM).to_string();
                path.replace(&format!("{{{name}}}"), &encoded)
            })
    }
}

/// Response of a successful API call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    /// Deserialize the body; an empty body reads as JSON `null`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        if self.body.trim().is_empty() {
            return serde_json::from_value(serde_json::Value::Null);
        }
        serde_json::from_str(&self.body)
    }
}

/// Low-level call operation of an API client
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn call_api(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// reqwest-backed transport rooted at a base URL
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    basic_auth: Option<(String, String)>,
    default_headers: HashMap<String, String>,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("basic_auth", &self.basic_auth.as_ref().map(|(user, _)| user))
            .field("default_headers", &self.default_headers)
            .finish()
    }
}

impl HttpTransport {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            basic_auth: None,
            default_headers: HashMap::new(),
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    /// Header sent with every request unless the request sets it itself
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &ApiRequest) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            request.expanded_path().trim_start_matches('/')
        )
    }

    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut builder = self.http.request(request.method.clone(), self.url_for(request));

        if !request.query_params.is_empty() {
            builder = builder.query(&request.query_params);
        }

        for (name, value) in &self.default_headers {
            let overridden = request
                .header_params
                .keys()
                .any(|key| key.eq_ignore_ascii_case(name));
            if !overridden {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        for (name, value) in &request.header_params {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some((username, password)) = &self.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            });
        }

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn call_api(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        if is_instrumentation_suppressed() {
            return self.execute(request).await;
        }

        let span = debug_span!(
            "http_client_request",
            "otel.kind" = "client",
            "http.method" = request.method.as_str(),
            "http.url" = request.resource_path.as_str(),
        );
        self.execute(request).instrument(span).await
    }
}
