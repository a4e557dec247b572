//! Cache warmer schedule through the full authenticated HTTP stack

mod fixtures;

use company_orchestrator::schedules::{CacheWarmer, CACHE_WARMER_PERIOD};
use fixtures::OrchestratorMock;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use wiremock::matchers::{bearer_token, body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

const WARMER_PATH: &str = "/api/processes/task_cache_warmer";

#[tokio::test]
async fn test_run_once_starts_process_with_bearer_token() {
    let mock = OrchestratorMock::start().await;
    mock.mock_token("tok-1", 1).await;
    Mock::given(method("POST"))
        .and(path(WARMER_PATH))
        .and(bearer_token("tok-1"))
        .and(body_json(json!([{}])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "p-1"})))
        .expect(1)
        .mount(&mock.server)
        .await;

    let warmer = CacheWarmer::new(Arc::new(mock.client(true)));
    assert_eq!(warmer.period(), CACHE_WARMER_PERIOD);

    let response = warmer.run_once().await.unwrap();
    assert_eq!(response.status.as_u16(), 201);
}

#[tokio::test]
async fn test_schedule_survives_failed_runs_and_stops_on_shutdown() {
    let mock = OrchestratorMock::start().await;
    mock.mock_token("tok-1", 1).await;
    Mock::given(method("POST"))
        .and(path(WARMER_PATH))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock.server)
        .await;

    let client = Arc::new(mock.client(true));
    let warmer = CacheWarmer::new(client.clone()).with_period(Duration::from_millis(50));
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(async move { warmer.run(rx).await });
    tokio::time::sleep(Duration::from_millis(220)).await;
    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("schedule stops after shutdown")
        .unwrap();

    let stats = client.metrics().get_stats();
    assert!(stats.total_calls >= 2, "{stats:?}");
    assert_eq!(stats.errors, stats.total_calls);
    assert_eq!(stats.token_fetches, 1);
}
