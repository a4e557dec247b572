use reqwest::{Method, StatusCode};
use std::borrow::Borrow;
use tracing::{field::Empty, info_span, Span};

use super::errors::ApiError;

pub const HTTP_METHOD: &str = "http.method";
pub const HTTP_URL: &str = "http.url";
pub const HTTP_STATUS_CODE: &str = "http.status_code";
pub const HTTP_STATUS_TEXT: &str = "http.status_text";
pub const OTEL_STATUS_CODE: &str = "otel.status_code";

/// Client span covering one logical external API call, retry included
pub struct ExternalApiCallSpan {
    pub span: Span,
}

impl std::ops::Deref for ExternalApiCallSpan {
    type Target = Span;
    fn deref(&self) -> &Self::Target {
        &self.span
    }
}

impl Borrow<Span> for ExternalApiCallSpan {
    fn borrow(&self) -> &Span {
        &self.span
    }
}

impl ExternalApiCallSpan {
    pub fn new(client: &str, method: &Method, url: &str) -> Self {
        let name = format!("External Api Call {client}");
        let span = info_span!(
            "external_api_call",
            "otel.name" = name.as_str(),
            "otel.kind" = "client",
            "otel.status_code" = Empty,
            "client" = client,
            "http.method" = method.as_str(),
            "http.url" = url,
            "http.status_code" = Empty,
            "http.status_text" = Empty,
        );

        ExternalApiCallSpan { span }
    }

    /// Successful calls are always reported as 200/OK
    pub fn record_success(&self) {
        self.record_status(StatusCode::OK, "OK");
    }

    /// Only errors that carry an HTTP status annotate the span
    pub fn record_failure(&self, error: &ApiError) {
        if let Some(status) = error.status() {
            self.record_status(status, error.reason().unwrap_or_default());
        }
    }

    fn record_status(&self, status: StatusCode, text: &str) {
        if self.span.is_disabled() {
            return;
        }

        self.span.record(HTTP_STATUS_CODE, status.as_u16());
        self.span.record(HTTP_STATUS_TEXT, text);
        self.span.record(OTEL_STATUS_CODE, otel_status_for(status));
    }
}

/// Overall span status derived from the HTTP status code
pub fn otel_status_for(status: StatusCode) -> &'static str {
    if status.as_u16() < 400 {
        "Ok"
    } else {
        "Error"
    }
}
