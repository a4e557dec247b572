use reqwest::StatusCode;
use thiserror::Error;

/// Error raised by an [`ApiTransport`](super::ApiTransport) call
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-2xx status
    #[error("HTTP {status}: {reason}")]
    Status {
        status: StatusCode,
        reason: String,
        body: String,
    },
    /// The request never produced a usable response
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Request(err) => err.status(),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ApiError::Status { reason, .. } => Some(reason.as_str()),
            ApiError::Request(err) => err.status().and_then(|s| s.canonical_reason()),
        }
    }

    /// 401 and 403 are treated as an expired bearer token
    pub fn is_authorization_expired(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        )
    }
}

/// Error surfaced by [`AuthenticatedApiClient::call_api`](super::AuthenticatedApiClient::call_api)
#[derive(Debug, Error)]
pub enum ExternalCallError {
    /// The token endpoint answered with a non-2xx status. Never retried.
    #[error("Unauthorized: response for obtaining access_token ({status}): {body}")]
    TokenAcquisitionFailed { status: StatusCode, body: String },
    #[error("could not reach token endpoint: {0}")]
    TokenRequest(#[source] reqwest::Error),
    #[error("token endpoint response did not contain an access_token")]
    TokenResponseInvalid,
    #[error("OAuth2 is active but {0} is not configured")]
    MissingOAuth2Setting(&'static str),
    #[error(transparent)]
    ApiCallFailed(#[from] ApiError),
}

impl ExternalCallError {
    /// Upstream status, for both token endpoint and API failures
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ExternalCallError::TokenAcquisitionFailed { .. } => Some(StatusCode::UNAUTHORIZED),
            ExternalCallError::ApiCallFailed(err) => err.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: StatusCode) -> ApiError {
        ApiError::Status {
            status,
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body: String::new(),
        }
    }

    #[test]
    fn test_only_401_and_403_count_as_expired_authorization() {
        assert!(status_error(StatusCode::UNAUTHORIZED).is_authorization_expired());
        assert!(status_error(StatusCode::FORBIDDEN).is_authorization_expired());
        assert!(!status_error(StatusCode::NOT_FOUND).is_authorization_expired());
        assert!(!status_error(StatusCode::INTERNAL_SERVER_ERROR).is_authorization_expired());
    }

    #[test]
    fn test_token_failure_reports_unauthorized_with_body() {
        let err = ExternalCallError::TokenAcquisitionFailed {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"error":"invalid_client"}"#.to_string(),
        };

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        let message = err.to_string();
        assert!(message.starts_with("Unauthorized"));
        assert!(message.contains("invalid_client"));
    }

    #[test]
    fn test_api_failure_keeps_status_and_reason() {
        let err: ExternalCallError = status_error(StatusCode::BAD_GATEWAY).into();

        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(err.to_string(), "HTTP 502 Bad Gateway: Bad Gateway");
    }
}
