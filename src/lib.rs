// Company orchestrator extension library
// Authenticated external API calls, NSO access, preferences and schedules

pub mod config;
pub mod external;
pub mod observability;
pub mod preferences;
pub mod schedules;
pub mod services;
pub mod shutdown;
pub mod telemetry;
pub mod utils;

// Re-export key types for easy access
pub use config::CompanyConfig;
pub use external::{
    AccessToken, ApiError, ApiRequest, ApiResponse, ApiTransport, AuthenticatedApiClient,
    ClientCredentialsProvider, CredentialHolder, ExternalCallError, HttpTransport, TokenSource,
    TracePropagation,
};
pub use observability::{ExternalApiMetrics, ExternalApiStats};
pub use preferences::{
    InMemoryPreferenceStore, PreferenceError, PreferenceStore, UserPreference, UserPreferenceDomain,
};
#[cfg(feature = "database")]
pub use preferences::SqlitePreferenceStore;
pub use schedules::CacheWarmer;
pub use services::{NsoClient, NsoError};
pub use shutdown::ShutdownCoordinator;
pub use telemetry::{generate_correlation_id, init_telemetry, TelemetryGuard};
