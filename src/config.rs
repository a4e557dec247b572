use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Main configuration structure for the company extension
///
/// Every section is read from the same flat key space, so the recognized
/// option names (`OAUTH2_ACTIVE`, `TRACING_ENABLED`, `NSO_HOST`, ...) work
/// unchanged as environment variables or as keys in `company.toml`.
#[derive(Debug, Clone, Default)]
pub struct CompanyConfig {
    /// OAuth2 client-credentials settings for external API calls
    pub oauth2: OAuth2Settings,
    /// Logging and tracing settings
    pub tracing: TracingSettings,
    /// Endpoints and flags of the external systems we talk to
    pub external_services: ExternalServiceSettings,
    /// Preference storage settings
    pub database: DatabaseSettings,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct OAuth2Settings {
    /// Enables the whole token flow; when false all calls are unauthenticated
    pub oauth2_active: bool,
    pub oauth2_token_url: String,
    pub oauth2_resource_server_id: String,
    pub oauth2_resource_server_secret: String,
}

impl Default for OAuth2Settings {
    fn default() -> Self {
        Self {
            oauth2_active: true,
            oauth2_token_url: String::new(),
            oauth2_resource_server_id: String::new(),
            oauth2_resource_server_secret: String::new(),
        }
    }
}

impl fmt::Debug for OAuth2Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Settings")
            .field("oauth2_active", &self.oauth2_active)
            .field("oauth2_token_url", &self.oauth2_token_url)
            .field("oauth2_resource_server_id", &self.oauth2_resource_server_id)
            .field("oauth2_resource_server_secret", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingSettings {
    /// Enable OpenTelemetry tracing and trace-context propagation
    pub tracing_enabled: bool,
    pub service_name: String,
    /// Ratio of root traces that are sampled
    pub trace_sample_rate: f64,
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
}

impl Default for TracingSettings {
    fn default() -> Self {
        Self {
            tracing_enabled: false,
            service_name: "company-orchestrator".to_string(),
            trace_sample_rate: 0.1,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ExternalServiceSettings {
    /// Base URI of the orchestrator REST API
    pub orchestrator_uri: String,
    /// Base URI of the workflows GUI, used for subscription links
    pub workflows_gui_uri: String,
    pub crm_uri: String,
    pub ims_uri: String,
    pub ipam_uri: String,
    pub jira_uri: String,
    pub nso_host: String,
    pub nso_user: String,
    pub nso_pass: String,
    pub nso_port: u16,
    pub nso_ssl_verify: bool,
    /// Feature flag for every NSO operation
    pub nso_enabled: bool,
}

impl Default for ExternalServiceSettings {
    fn default() -> Self {
        Self {
            orchestrator_uri: "http://localhost:8080".to_string(),
            workflows_gui_uri: "http://localhost:3000".to_string(),
            crm_uri: "https://api.dev.automation.surf.net".to_string(),
            ims_uri: "https://api.dev.automation.surf.net".to_string(),
            ipam_uri: "https://api.dev.automation.surf.net".to_string(),
            jira_uri: "https://api.dev.automation.surf.net".to_string(),
            nso_host: "nso-dev.vtb.automation.surf.net".to_string(),
            nso_user: "ncsadmin".to_string(),
            nso_pass: "ncsadmin".to_string(),
            nso_port: 8888,
            nso_ssl_verify: true,
            nso_enabled: true,
        }
    }
}

impl fmt::Debug for ExternalServiceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalServiceSettings")
            .field("orchestrator_uri", &self.orchestrator_uri)
            .field("workflows_gui_uri", &self.workflows_gui_uri)
            .field("crm_uri", &self.crm_uri)
            .field("ims_uri", &self.ims_uri)
            .field("ipam_uri", &self.ipam_uri)
            .field("jira_uri", &self.jira_uri)
            .field("nso_host", &self.nso_host)
            .field("nso_user", &self.nso_user)
            .field("nso_pass", &"***")
            .field("nso_port", &self.nso_port)
            .field("nso_ssl_verify", &self.nso_ssl_verify)
            .field("nso_enabled", &self.nso_enabled)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite connection string for the preference store
    pub database_url: String,
    /// Run migrations on connect
    pub database_auto_migrate: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://company-orchestrator.db".to_string(),
            database_auto_migrate: true,
        }
    }
}

impl CompanyConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (company.toml)
    /// 3. Environment variables (unprefixed, e.g. OAUTH2_ACTIVE)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("company.toml").exists() {
            builder = builder.add_source(File::with_name("company"));
        }

        builder = builder.add_source(Environment::default());

        let config = builder.build()?;
        Ok(Self::from_config(config)?)
    }

    /// Deserialize every settings section from an already built source
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        Ok(Self {
            oauth2: config.clone().try_deserialize()?,
            tracing: config.clone().try_deserialize()?,
            external_services: config.clone().try_deserialize()?,
            database: config.try_deserialize()?,
        })
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}
