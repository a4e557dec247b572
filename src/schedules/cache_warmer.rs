//! Keeps the orchestrator's subscription cache warm by starting the
//! cache warmer task on a fixed period.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, info_span, Instrument};

use crate::external::{ApiRequest, ApiResponse, ApiTransport, AuthenticatedApiClient, ExternalCallError};
use crate::telemetry::generate_correlation_id;

pub const CACHE_WARMER_PERIOD: Duration = Duration::from_secs(30 * 60);
pub const CACHE_WARMER_PROCESS: &str = "task_cache_warmer";

pub struct CacheWarmer<T> {
    client: Arc<AuthenticatedApiClient<T>>,
    period: Duration,
}

impl<T: ApiTransport> CacheWarmer<T> {
    pub fn new(client: Arc<AuthenticatedApiClient<T>>) -> Self {
        Self {
            client,
            period: CACHE_WARMER_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start one cache warmer process run
    pub async fn run_once(&self) -> Result<ApiResponse, ExternalCallError> {
        let correlation_id = generate_correlation_id();
        let span = info_span!("cache_warmer", correlation_id = %correlation_id);

        async {
            info!(process = CACHE_WARMER_PROCESS, "Starting cache warmer");
            let request = ApiRequest::post("/api/processes/{name}")
                .with_path_param("name", CACHE_WARMER_PROCESS)
                .with_json_body(json!([{}]));
            self.client.call_api(request).await
        }
        .instrument(span)
        .await
    }

    /// Run once per period, starting one period from now, until `shutdown`
    /// flips to true. Failures are logged and the next tick proceeds as usual.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(period_secs = self.period.as_secs(), "Cache warmer schedule started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.run_once().await {
                        error!(error = %err, "Cache warmer run failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Cache warmer schedule stopped");
    }
}
