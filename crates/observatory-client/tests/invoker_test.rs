//! Integration tests for single API calls

mod common;

use common::{FINISHED_FIXTURE, PENDING_FIXTURE, SITE};
use observatory_client::{
    ApiInvoker, HttpTransport, ObservatoryError, RequestSpec, TransportProvider, RESCAN_BODY,
};
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn invoker(base_url: &str) -> ApiInvoker {
    let http = HttpTransport::direct()
        .http_client(Duration::from_secs(10))
        .expect("Failed to create HTTP client");
    ApiInvoker::new(http, base_url)
}

#[tokio::test]
async fn test_post_sends_json_headers_and_form_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .and(query_param("host", SITE))
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .and(body_string(RESCAN_BODY))
        .respond_with(ResponseTemplate::new(200).set_body_string(PENDING_FIXTURE))
        .expect(1)
        .mount(&mock_server)
        .await;

    let spec = RequestSpec::post("analyze")
        .with_option("host", SITE)
        .with_body(RESCAN_BODY);
    let body = invoker(&mock_server.uri())
        .call(&spec)
        .await
        .expect("POST should succeed");

    assert_eq!(body, PENDING_FIXTURE);
}

#[tokio::test]
async fn test_get_returns_raw_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/analyze"))
        .and(query_param("host", SITE))
        .respond_with(ResponseTemplate::new(200).set_body_string(FINISHED_FIXTURE))
        .expect(1)
        .mount(&mock_server)
        .await;

    let spec = RequestSpec::get("analyze").with_option("host", SITE);
    let body = invoker(&mock_server.uri())
        .call(&spec)
        .await
        .expect("GET should succeed");

    assert_eq!(body, FINISHED_FIXTURE);
}

#[tokio::test]
async fn test_json_error_object_is_not_an_in_band_marker() {
    // The invoker only looks for the literal marker; JSON error objects are
    // left to the callers that decode the body
    let mock_server = MockServer::start().await;
    let ftr = r#"{"error":"recent-scan-not-found","text":"Recently completed scan for www.ssllabs.com not found"}"#;

    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ftr))
        .mount(&mock_server)
        .await;

    let spec = RequestSpec::post("analyze")
        .with_option("host", SITE)
        .with_body("hidden=true");
    let body = invoker(&mock_server.uri())
        .call(&spec)
        .await
        .expect("no marker in body");

    assert_eq!(body, ftr);
}

#[tokio::test]
async fn test_in_band_error_marker() {
    let mock_server = MockServer::start().await;
    let ftr = "error: invalid-hostname";

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ftr))
        .mount(&mock_server)
        .await;

    let err = invoker(&mock_server.uri())
        .call(&RequestSpec::get("analyze").with_option("host", SITE))
        .await
        .expect_err("marker should be reported");

    assert!(matches!(err, ObservatoryError::Api { ref body } if body == ftr));
}

#[tokio::test]
async fn test_non_200_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = invoker(&mock_server.uri())
        .call(&RequestSpec::get("analyze").with_option("host", SITE))
        .await
        .expect_err("503 should fail");

    assert!(matches!(
        err,
        ObservatoryError::HttpStatus { status: 503, ref body } if body == "Service Unavailable"
    ));
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/elsewhere"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FINISHED_FIXTURE))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = invoker(&mock_server.uri())
        .call(&RequestSpec::get("analyze").with_option("host", SITE))
        .await
        .expect_err("302 should surface");

    assert!(matches!(err, ObservatoryError::HttpStatus { status: 302, .. }));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Nothing listens on port 1
    let err = invoker("http://127.0.0.1:1")
        .call(&RequestSpec::get("analyze").with_option("host", SITE))
        .await
        .expect_err("connection should fail");

    assert!(matches!(err, ObservatoryError::Transport(_)));
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(FINISHED_FIXTURE)
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let http = HttpTransport::direct()
        .http_client(Duration::from_millis(200))
        .expect("Failed to create HTTP client");
    let err = ApiInvoker::new(http, mock_server.uri())
        .call(&RequestSpec::get("analyze").with_option("host", SITE))
        .await
        .expect_err("request should time out");

    assert!(matches!(err, ObservatoryError::Transport(ref e) if e.is_timeout()));
}
