//! Span and trace-context behaviour of authenticated calls, observed through
//! a recording layer next to the OpenTelemetry layer.

mod fixtures;

use company_orchestrator::external::suppress_further_instrumentation;
use company_orchestrator::{ApiRequest, ApiTransport, HttpTransport};
use fixtures::OrchestratorMock;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[derive(Debug, Clone)]
struct RecordedSpan {
    name: String,
    fields: BTreeMap<String, String>,
}

#[derive(Clone, Default)]
struct RecordingLayer {
    spans: Arc<Mutex<Vec<(u64, RecordedSpan)>>>,
}

impl RecordingLayer {
    fn named(&self, name: &str) -> Vec<RecordedSpan> {
        self.spans
            .lock()
            .expect("recording layer lock")
            .iter()
            .filter(|(_, span)| span.name == name)
            .map(|(_, span)| span.clone())
            .collect()
    }
}

#[derive(Default)]
struct FieldVisitor {
    fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields.insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S> Layer<S> for RecordingLayer
where
    S: tracing::Subscriber,
{
    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &tracing::Id, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        self.spans.lock().expect("recording layer lock").push((
            id.into_u64(),
            RecordedSpan {
                name: attrs.metadata().name().to_string(),
                fields: visitor.fields,
            },
        ));
    }

    fn on_record(&self, id: &tracing::Id, values: &tracing::span::Record<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);
        let mut spans = self.spans.lock().expect("recording layer lock");
        // Ids are reused after close, the latest entry is the live one
        if let Some((_, span)) = spans.iter_mut().rev().find(|(span_id, _)| *span_id == id.into_u64()) {
            span.fields.extend(visitor.fields);
        }
    }
}

fn install_subscriber() -> (RecordingLayer, TracerProvider, DefaultGuard) {
    let provider = TracerProvider::builder().build();
    let tracer = provider.tracer("trace-propagation-tests");
    let recording = RecordingLayer::default();

    let subscriber = tracing_subscriber::registry()
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(recording.clone());
    let guard = tracing::subscriber::set_default(subscriber);

    (recording, provider, guard)
}

async fn mock_api(mock: &OrchestratorMock, status: u16) {
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&mock.server)
        .await;
}

fn is_traceparent(value: &str) -> bool {
    let parts: Vec<&str> = value.split('-').collect();
    parts.len() == 4
        && parts[0] == "00"
        && parts[1].len() == 32
        && parts[2].len() == 16
        && parts.iter().all(|part| part.chars().all(|c| c.is_ascii_hexdigit()))
}

#[tokio::test]
async fn test_traceparent_injected_when_tracing_enabled() {
    let (_recording, _provider, _guard) = install_subscriber();
    let mock = OrchestratorMock::start().await;
    mock_api(&mock, 200).await;

    let client = mock.client_with(&mock.config(false, true));
    client.call_api(ApiRequest::get("/api/health")).await.unwrap();

    let requests = mock.server.received_requests().await.unwrap();
    let traceparent = requests[0]
        .headers
        .get("traceparent")
        .and_then(|value| value.to_str().ok())
        .expect("traceparent header");
    assert!(is_traceparent(traceparent), "{traceparent}");
}

#[tokio::test]
async fn test_no_trace_headers_when_tracing_disabled() {
    let (_recording, _provider, _guard) = install_subscriber();
    let mock = OrchestratorMock::start().await;
    mock_api(&mock, 200).await;

    let client = mock.client_with(&mock.config(false, false));
    client.call_api(ApiRequest::get("/api/health")).await.unwrap();

    let requests = mock.server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("traceparent").is_none());
}

#[tokio::test]
async fn test_no_trace_headers_for_call_nested_in_suppressed_scope() {
    let (_recording, _provider, _guard) = install_subscriber();
    let mock = OrchestratorMock::start().await;
    mock_api(&mock, 200).await;

    let client = mock.client_with(&mock.config(false, true));
    suppress_further_instrumentation(client.call_api(ApiRequest::get("/api/health")))
        .await
        .unwrap();

    let requests = mock.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("traceparent").is_none());
}

#[tokio::test]
async fn test_wrapper_span_replaces_transport_span() {
    let (recording, _provider, _guard) = install_subscriber();
    let mock = OrchestratorMock::start().await;
    mock_api(&mock, 200).await;

    let client = mock.client(false);
    client.call_api(ApiRequest::get("/api/health")).await.unwrap();

    let spans = recording.named("external_api_call");
    assert_eq!(spans.len(), 1);
    let fields = &spans[0].fields;
    assert_eq!(fields.get("otel.name").map(String::as_str), Some("External Api Call orchestrator"));
    assert_eq!(fields.get("otel.kind").map(String::as_str), Some("client"));
    assert_eq!(fields.get("http.method").map(String::as_str), Some("GET"));
    assert_eq!(fields.get("http.url").map(String::as_str), Some("/api/health"));
    assert_eq!(fields.get("http.status_code").map(String::as_str), Some("200"));
    assert_eq!(fields.get("http.status_text").map(String::as_str), Some("OK"));
    assert_eq!(fields.get("otel.status_code").map(String::as_str), Some("Ok"));

    // The transport's own span is suppressed inside the wrapper
    assert!(recording.named("http_client_request").is_empty());
}

#[tokio::test]
async fn test_failed_call_marks_span_as_error() {
    let (recording, _provider, _guard) = install_subscriber();
    let mock = OrchestratorMock::start().await;
    mock_api(&mock, 404).await;

    let client = mock.client(false);
    client.call_api(ApiRequest::get("/api/health")).await.unwrap_err();

    let spans = recording.named("external_api_call");
    let fields = &spans[0].fields;
    assert_eq!(fields.get("http.status_code").map(String::as_str), Some("404"));
    assert_eq!(fields.get("http.status_text").map(String::as_str), Some("Not Found"));
    assert_eq!(fields.get("otel.status_code").map(String::as_str), Some("Error"));
}

#[tokio::test]
async fn test_connection_failure_leaves_span_status_unset() {
    let (recording, _provider, _guard) = install_subscriber();
    let mut config = company_orchestrator::CompanyConfig::default();
    config.oauth2.oauth2_active = false;
    // Nothing listens on the discard port
    config.external_services.orchestrator_uri = "http://127.0.0.1:9".to_string();

    let http = reqwest::Client::new();
    let transport = HttpTransport::new(http.clone(), &config.external_services.orchestrator_uri);
    let client = company_orchestrator::AuthenticatedApiClient::from_config("orchestrator", transport, http, &config)
        .unwrap();

    let err = client.call_api(ApiRequest::get("/api/health")).await.unwrap_err();
    assert_eq!(err.status(), None);
    assert_eq!(client.metrics().get_stats().transport_attempts, 1);

    let spans = recording.named("external_api_call");
    assert_eq!(spans.len(), 1);
    let fields = &spans[0].fields;
    assert!(!fields.contains_key("http.status_code"), "{fields:?}");
    assert!(!fields.contains_key("otel.status_code"), "{fields:?}");
}

#[tokio::test]
async fn test_bare_transport_keeps_its_own_span() {
    let (recording, _provider, _guard) = install_subscriber();
    let mock = OrchestratorMock::start().await;
    mock_api(&mock, 200).await;

    let transport = HttpTransport::new(reqwest::Client::new(), mock.uri());
    transport.call_api(&ApiRequest::get("/api/health")).await.unwrap();

    assert_eq!(recording.named("http_client_request").len(), 1);
    assert!(recording.named("external_api_call").is_empty());
}
