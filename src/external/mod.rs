//! Clients for the external systems the tenant talks to
//!
//! [`AuthenticatedApiClient`] decorates any [`ApiTransport`] with OAuth2
//! client-credentials authentication, a traced client span and a one-shot
//! retry when the held token turns out to be expired.

pub mod client;
pub mod credentials;
pub mod errors;
pub mod propagation;
pub mod span;
pub mod suppress;
pub mod token;
pub mod transport;

pub use client::AuthenticatedApiClient;
pub use credentials::{AccessToken, CredentialHolder};
pub use errors::{ApiError, ExternalCallError};
pub use propagation::TracePropagation;
pub use span::ExternalApiCallSpan;
pub use suppress::{is_instrumentation_suppressed, suppress_further_instrumentation};
pub use token::{ClientCredentialsProvider, TokenSource, TOKEN_REQUEST_TIMEOUT};
pub use transport::{ApiRequest, ApiResponse, ApiTransport, HttpTransport};
