//! Common test utilities

#![allow(dead_code)]

use chrono::Utc;
use observatory_client::{HttpTransport, ObservatoryClient};
use observatory_core::AppConfig;
use wiremock::MockServer;

pub const SITE: &str = "www.ssllabs.com";

/// Poll interval used by test clients, in milliseconds
pub const POLL_MS: u64 = 20;

pub const FINISHED_FIXTURE: &str = include_str!("../fixtures/ssllabs-get.json");
pub const PENDING_FIXTURE: &str = include_str!("../fixtures/ssllabs-post.json");
pub const HISTORY_FIXTURE: &str = include_str!("../fixtures/ssllabs-history.json");
pub const REPORT_FIXTURE: &str = include_str!("../fixtures/ssllabs-8507653.json");

/// Creates a test config pointing to a wiremock server
pub fn test_config(base_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.client.base_url = base_url.to_string();
    config.client.poll_interval_ms = POLL_MS;
    config
}

/// Client against `server` that ignores any proxy environment
pub fn test_client(server: &MockServer) -> ObservatoryClient {
    client_with(test_config(&server.uri()))
}

pub fn client_with(config: AppConfig) -> ObservatoryClient {
    ObservatoryClient::with_transport(&config, &HttpTransport::direct())
        .expect("Failed to create client")
}

/// FINISHED analyze body that ended just now, so it is cacheable
pub fn finished_now(grade: &str, score: i32, scan_id: u64) -> String {
    let end_time = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    serde_json::json!({
        "algorithm_version": 2,
        "end_time": end_time,
        "grade": grade,
        "hidden": true,
        "likelihood_indicator": "LOW",
        "response_headers": {"Server": "nginx"},
        "scan_id": scan_id,
        "score": score,
        "start_time": end_time,
        "state": "FINISHED",
        "status_code": 200,
        "tests_failed": 1,
        "tests_passed": 11,
        "tests_quantity": 12
    })
    .to_string()
}

/// Analyze body in an arbitrary lifecycle state
pub fn with_state(state: &str) -> String {
    serde_json::json!({
        "algorithm_version": 2,
        "end_time": null,
        "grade": null,
        "hidden": true,
        "scan_id": 8_507_653,
        "score": null,
        "start_time": "Thu, 13 Sep 2018 12:56:19 GMT",
        "state": state,
        "tests_failed": 0,
        "tests_passed": 0,
        "tests_quantity": 0
    })
    .to_string()
}

/// Number of requests the server saw with `method` on `path`
pub async fn count_requests(server: &MockServer, method: &str, path: &str) -> usize {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter(|r| r.method.as_str() == method && r.url.path() == path)
        .count()
}
