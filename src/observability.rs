use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// External API usage metrics, one instance per authenticated client
#[derive(Debug, Default)]
pub struct ExternalApiMetrics {
    pub total_calls: AtomicU64,
    pub transport_attempts: AtomicU64,
    pub token_fetches: AtomicU64,
    pub auth_retries: AtomicU64,
    pub errors: AtomicU64,
}

impl ExternalApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&self) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attempt(&self) {
        self.transport_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_token_fetch(&self) {
        self.token_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_retry(&self) {
        self.auth_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> ExternalApiStats {
        ExternalApiStats {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            transport_attempts: self.transport_attempts.load(Ordering::Relaxed),
            token_fetches: self.token_fetches.load(Ordering::Relaxed),
            auth_retries: self.auth_retries.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self, client: &str) {
        let stats = self.get_stats();
        info!(
            client,
            calls = stats.total_calls,
            attempts = stats.transport_attempts,
            token_fetches = stats.token_fetches,
            auth_retries = stats.auth_retries,
            errors = stats.errors,
            "External API metrics"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExternalApiStats {
    pub total_calls: u64,
    pub transport_attempts: u64,
    pub token_fetches: u64,
    pub auth_retries: u64,
    pub errors: u64,
}
