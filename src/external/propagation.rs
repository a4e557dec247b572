use opentelemetry::propagation::TextMapPropagator;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::TracingSettings;

/// Trace-context injection without relying on the global propagator
#[derive(Clone, Debug, Default)]
pub struct TracePropagation {
    propagator: Option<Arc<dyn TextMapPropagator + Send + Sync>>,
}

impl TracePropagation {
    /// W3C TraceContext when tracing is enabled, nothing otherwise
    pub fn from_settings(settings: &TracingSettings) -> Self {
        if settings.tracing_enabled {
            Self::trace_context()
        } else {
            Self::disabled()
        }
    }

    pub fn trace_context() -> Self {
        Self {
            propagator: Some(Arc::new(TraceContextPropagator::new())),
        }
    }

    pub fn disabled() -> Self {
        Self { propagator: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.propagator.is_some()
    }

    /// Write the context of `span` into outbound headers
    pub fn inject_span(&self, span: &tracing::Span, headers: &mut HashMap<String, String>) {
        if let Some(propagator) = &self.propagator {
            let context = span.context();
            propagator.inject_context(&context, headers);
        }
    }
}
