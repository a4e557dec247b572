use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_sdk::export::trace::SpanExporter;
use opentelemetry_sdk::trace::{Sampler, TracerProvider};
use opentelemetry_sdk::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::TracingSettings;

/// Keeps the tracer provider alive; flushes and shuts it down on drop
pub struct TelemetryGuard {
    provider: Option<TracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(err) = provider.shutdown() {
                eprintln!("Failed to shut down tracer provider: {err}");
            }
        }
    }
}

/// Initialize structured logging, plus OpenTelemetry export to stdout when tracing is enabled
pub fn init_telemetry(settings: &TracingSettings) -> Result<TelemetryGuard> {
    init_telemetry_with_exporter(settings, opentelemetry_stdout::SpanExporter::default())
}

/// Same as [`init_telemetry`] with a caller supplied span exporter
pub fn init_telemetry_with_exporter<E>(settings: &TracingSettings, exporter: E) -> Result<TelemetryGuard>
where
    E: SpanExporter + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_current_span(true)
        .with_span_list(true);

    if !settings.tracing_enabled {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;

        tracing::info!("Telemetry initialized with structured logging");
        return Ok(TelemetryGuard { provider: None });
    }

    let provider = TracerProvider::builder()
        .with_simple_exporter(exporter)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            settings.trace_sample_rate,
        ))))
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            settings.service_name.clone(),
        )]))
        .build();
    let tracer = provider.tracer("company-orchestrator");

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()?;

    tracing::info!(
        service = %settings.service_name,
        sample_rate = settings.trace_sample_rate,
        "Telemetry initialized with OpenTelemetry tracing"
    );
    Ok(TelemetryGuard {
        provider: Some(provider),
    })
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
