use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

/// Time background jobs get to stop after shutdown is signalled
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Graceful shutdown coordinator for the background schedules
pub struct ShutdownCoordinator {
    sender: watch::Sender<bool>,
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender,
            tasks: Vec::new(),
        }
    }

    /// Receiver that flips to `true` once shutdown starts
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }

    /// Spawn a named job that is awaited on shutdown
    pub fn spawn<F>(&mut self, name: impl Into<String>, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        info!(job = %name, "Starting background job");
        self.tasks.push((name, tokio::spawn(job)));
    }

    pub fn trigger(&self) {
        // send_replace succeeds even without live receivers
        self.sender.send_replace(true);
    }

    /// Wait for SIGINT, then shut everything down
    pub async fn wait_for_shutdown(self) -> Result<()> {
        info!("Shutdown coordinator ready - will shutdown gracefully on SIGINT");
        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");
        self.shutdown().await
    }

    /// Signal every job and wait for them within the grace period
    pub async fn shutdown(self) -> Result<()> {
        info!("Initiating graceful shutdown of all background jobs...");
        self.trigger();

        for (name, handle) in self.tasks {
            match timeout(SHUTDOWN_GRACE_PERIOD, handle).await {
                Ok(Ok(())) => info!(job = %name, "Background job stopped"),
                Ok(Err(err)) => warn!(job = %name, error = %err, "Background job failed"),
                Err(_) => warn!(job = %name, "Timeout waiting for background job to stop"),
            }
        }

        info!("Graceful shutdown completed successfully");
        Ok(())
    }
}
