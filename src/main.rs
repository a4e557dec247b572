use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use company_orchestrator::external::TokenSource;
use company_orchestrator::preferences::{PreferenceStore, UserPreferenceDomain};
use company_orchestrator::services::nso::remove_empty_values;
use company_orchestrator::{
    init_telemetry, ApiRequest, AuthenticatedApiClient, CacheWarmer, ClientCredentialsProvider,
    CompanyConfig, HttpTransport, NsoClient, ShutdownCoordinator,
};

#[derive(Parser)]
#[command(name = "company-orchestrator")]
#[command(about = "Operational tooling for the company orchestrator extension")]
#[command(long_about = "Calls the orchestrator and its neighbouring systems with OAuth2 \
                       client-credentials authentication, inspects NSO devices, manages \
                       user preferences and runs the cache warmer schedule.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an access token with the configured client credentials
    Token {
        /// Print the token itself instead of a confirmation
        #[arg(long)]
        show: bool,
    },
    /// Call an orchestrator API endpoint through the authenticated client
    Call {
        /// HTTP method, e.g. GET or POST
        method: String,
        /// Resource path relative to ORCHESTRATOR_URI
        path: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
        /// Query parameter as key=value, may be repeated
        #[arg(long = "query", value_name = "KEY=VALUE")]
        query: Vec<String>,
    },
    /// Inspect and operate NSO devices and services
    Nso {
        #[command(subcommand)]
        command: NsoCommands,
    },
    /// Read and write user preferences
    Preferences {
        #[command(subcommand)]
        command: PreferenceCommands,
    },
    /// Start the cache warmer process, periodically until interrupted
    WarmCache {
        /// Run a single cache warmer process and exit
        #[arg(long)]
        once: bool,
        /// Period between runs in seconds
        #[arg(long, default_value_t = 1800)]
        period_secs: u64,
    },
}

#[derive(Subcommand)]
enum NsoCommands {
    /// Show the curated device information of a node
    NodeInfo { name: String },
    /// Report whether the device configuration is in sync
    CheckSync { name: String },
    /// Set the admin state of a node to unlocked
    Unlock { name: String },
    /// List all configured services
    Services,
}

#[derive(Subcommand)]
enum PreferenceCommands {
    /// Show the preferences of a user in a domain
    Get { domain: String, user_name: String },
    /// Replace the preferences of a user in a domain with a JSON object
    Set {
        domain: String,
        user_name: String,
        preferences: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    CompanyConfig::load_env_file()?;
    let config = CompanyConfig::load()?;
    let _telemetry = init_telemetry(&config.tracing)?;

    tokio::runtime::Runtime::new()?.block_on(async {
        match cli.command {
            Commands::Token { show } => token_command(&config, show).await,
            Commands::Call {
                method,
                path,
                body,
                query,
            } => call_command(&config, &method, path, body, query).await,
            Commands::Nso { command } => nso_command(&config, command).await,
            Commands::Preferences { command } => preferences_command(&config, command).await,
            Commands::WarmCache { once, period_secs } => {
                warm_cache_command(&config, once, Duration::from_secs(period_secs)).await
            }
        }
    })
}

fn orchestrator_client(config: &CompanyConfig) -> Result<AuthenticatedApiClient<HttpTransport>> {
    let http = reqwest::Client::new();
    let transport = HttpTransport::new(http.clone(), &config.external_services.orchestrator_uri);
    Ok(AuthenticatedApiClient::from_config(
        "orchestrator",
        transport,
        http,
        config,
    )?)
}

async fn token_command(config: &CompanyConfig, show: bool) -> Result<()> {
    let provider = match ClientCredentialsProvider::from_settings(reqwest::Client::new(), &config.oauth2)? {
        Some(provider) => provider,
        None => {
            println!("OAuth2 is disabled (OAUTH2_ACTIVE=false)");
            return Ok(());
        }
    };

    let token = provider.fetch_token().await?;
    if show {
        println!("{}", token.secret());
    } else {
        println!("Access token acquired from {}", provider.token_url());
    }
    Ok(())
}

async fn call_command(
    config: &CompanyConfig,
    method: &str,
    path: String,
    body: Option<String>,
    query: Vec<String>,
) -> Result<()> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method: {method}"))?;

    let mut request = ApiRequest::new(method, path);
    for pair in &query {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("query parameter must be KEY=VALUE: {pair}"))?;
        request = request.with_query_param(key, value);
    }
    if let Some(body) = body {
        let body: Value = serde_json::from_str(&body).context("request body is not valid JSON")?;
        request = request.with_json_body(body);
    }

    let client = orchestrator_client(config)?;
    let result = client.call_api(request).await;
    client.metrics().log_stats(client.name());

    let response = result?;
    println!("{}", response.status);
    if !response.body.is_empty() {
        println!("{}", response.body);
    }
    Ok(())
}

async fn nso_command(config: &CompanyConfig, command: NsoCommands) -> Result<()> {
    let nso = NsoClient::from_settings(&config.external_services)?;

    match command {
        NsoCommands::NodeInfo { name } => {
            let info = nso.get_node_info(&name).await?;
            println!("{}", serde_json::to_string_pretty(&remove_empty_values(&info))?);
        }
        NsoCommands::CheckSync { name } => {
            let in_sync = nso.is_in_sync(&name).await?;
            println!("{name}: {}", if in_sync { "in-sync" } else { "out-of-sync" });
        }
        NsoCommands::Unlock { name } => {
            nso.set_node_unlocked(&name).await?;
            println!("{name}: unlocked");
        }
        NsoCommands::Services => {
            let services = nso.get_all_services().await?;
            println!("{}", serde_json::to_string_pretty(&services)?);
        }
    }
    Ok(())
}

#[cfg(feature = "database")]
async fn open_preference_store(config: &CompanyConfig) -> Result<Box<dyn PreferenceStore>> {
    let store = company_orchestrator::SqlitePreferenceStore::connect(
        &config.database.database_url,
        config.database.database_auto_migrate,
    )
    .await?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "database"))]
async fn open_preference_store(config: &CompanyConfig) -> Result<Box<dyn PreferenceStore>> {
    tracing::warn!(
        database_url = %config.database.database_url,
        "Built without the database feature; preferences are not persisted"
    );
    Ok(Box::new(company_orchestrator::InMemoryPreferenceStore::new()))
}

async fn preferences_command(config: &CompanyConfig, command: PreferenceCommands) -> Result<()> {
    match command {
        PreferenceCommands::Get { domain, user_name } => {
            let domain: UserPreferenceDomain = domain.parse()?;
            let store = open_preference_store(config).await?;
            let preference = store.get_preferences(domain, &user_name).await?;
            println!("{}", serde_json::to_string_pretty(&preference)?);
        }
        PreferenceCommands::Set {
            domain,
            user_name,
            preferences,
        } => {
            let domain: UserPreferenceDomain = domain.parse()?;
            let preferences: Value =
                serde_json::from_str(&preferences).context("preferences are not valid JSON")?;
            let store = open_preference_store(config).await?;
            store.update_preferences(domain, &user_name, preferences).await?;
            println!("Preferences of {user_name} in {domain} updated");
        }
    }
    Ok(())
}

async fn warm_cache_command(config: &CompanyConfig, once: bool, period: Duration) -> Result<()> {
    let client = Arc::new(orchestrator_client(config)?);
    let warmer = CacheWarmer::new(client.clone()).with_period(period);

    if once {
        let result = warmer.run_once().await;
        client.metrics().log_stats(client.name());
        let response = result?;
        println!("{}", response.status);
        return Ok(());
    }

    let mut coordinator = ShutdownCoordinator::new();
    let shutdown = coordinator.subscribe();
    coordinator.spawn("cache_warmer", async move { warmer.run(shutdown).await });
    coordinator.wait_for_shutdown().await?;

    client.metrics().log_stats(client.name());
    Ok(())
}
