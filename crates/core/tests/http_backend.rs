//! Integration tests for the HTTP backend adapter against a mock server.

mod common;

use common::*;
use gb_core::backend::{Backend, BackendError, CrawlOutcome, HttpBackend};
use gb_core::config::load_config;
use gb_core::engine::PipelineEngine;
use gb_protocol::config_models::BackendConfig;
use gb_protocol::pipeline_models::{FailedStage, PipelineBranch, PipelineOutcome, StepName};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> HttpBackend {
    let config = BackendConfig {
        base_url: server.uri(),
        ..Default::default()
    };
    HttpBackend::new(&config).expect("client builds")
}

async fn mount_step(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .and(body_json(json!({ "page_id": "page_1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_step_success_carries_time_and_results() {
    let server = MockServer::start().await;
    mount_step(
        &server,
        "/api/structure-documents",
        json!({
            "success": true,
            "execution_time": 10.5,
            "results": { "documents": [{ "name": "guide.pdf" }] }
        }),
    )
    .await;

    let success = backend_for(&server)
        .run_step(StepName::Document, "page_1")
        .await
        .unwrap();

    assert_eq!(success.execution_time, Some(10.5));
    assert_eq!(
        success.results,
        Some(json!({ "documents": [{ "name": "guide.pdf" }] }))
    );
}

#[tokio::test]
async fn test_crawl_no_urls_by_error_code() {
    let server = MockServer::start().await;
    mount_step(
        &server,
        "/api/crawl",
        json!({ "success": false, "error": "nothing registered", "error_code": "no_urls" }),
    )
    .await;

    let outcome = backend_for(&server).crawl("page_1").await;
    assert_eq!(outcome, CrawlOutcome::NoUrlsToCrawl);
}

#[tokio::test]
async fn test_crawl_no_urls_by_legacy_message() {
    let server = MockServer::start().await;
    mount_step(
        &server,
        "/api/crawl",
        json!({ "success": false, "error": "크롤링할 URL이 없습니다." }),
    )
    .await;

    let outcome = backend_for(&server).crawl("page_1").await;
    assert_eq!(outcome, CrawlOutcome::NoUrlsToCrawl);
}

#[tokio::test]
async fn test_crawl_other_failure() {
    let server = MockServer::start().await;
    mount_step(
        &server,
        "/api/crawl",
        json!({ "success": false, "error": "robots.txt disallows crawling" }),
    )
    .await;

    let outcome = backend_for(&server).crawl("page_1").await;
    assert_eq!(
        outcome,
        CrawlOutcome::Failure(BackendError::StepFailed(
            "robots.txt disallows crawling".to_string()
        ))
    );
}

#[tokio::test]
async fn test_error_status_is_judged_by_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/apply"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "success": false, "error": "index build failed" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/update"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let backend = backend_for(&server);

    let err = backend.run_step(StepName::Indexing, "page_1").await.unwrap_err();
    assert_eq!(err, BackendError::StepFailed("index build failed".to_string()));

    let err = backend.run_step(StepName::Update, "page_1").await.unwrap_err();
    assert!(err.to_string().starts_with("HTTP 502"), "got {err}");
}

#[tokio::test]
async fn test_unreadable_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/clean-lines"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .run_step(StepName::Line1, "page_1")
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_processing_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/processing-status"))
        .and(query_param("page_id", "page_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "processing": true })))
        .mount(&server)
        .await;

    let processing = backend_for(&server).processing_status("page_1").await;
    assert_eq!(processing, Ok(true));
}

#[tokio::test]
async fn test_unreachable_backend() {
    let config = BackendConfig {
        // Port 9 (discard) is not expected to accept HTTP connections
        base_url: "http://127.0.0.1:9".to_string(),
        request_timeout_secs: Some(2),
        ..Default::default()
    };
    let backend = HttpBackend::new(&config).unwrap();

    let err = backend.run_step(StepName::Update, "page_1").await.unwrap_err();
    assert!(matches!(err, BackendError::Transport { .. }));
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/update"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = BackendConfig {
        base_url: server.uri(),
        request_timeout_secs: Some(1),
        ..Default::default()
    };
    let err = HttpBackend::new(&config)
        .unwrap()
        .run_step(StepName::Update, "page_1")
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Transport { .. }));
}

/// A documents-only build end to end over HTTP, configured from disk.
#[tokio::test]
async fn test_engine_over_http_without_urls() {
    let server = MockServer::start().await;
    mount_step(
        &server,
        "/api/crawl",
        json!({ "success": false, "error": "크롤링할 URL이 없습니다" }),
    )
    .await;
    mount_step(
        &server,
        "/api/structure-documents",
        json!({ "success": true, "execution_time": 10.0 }),
    )
    .await;
    mount_step(&server, "/api/apply", json!({ "success": true, "execution_time": 20.0 })).await;
    mount_step(&server, "/api/update", json!({ "success": true, "execution_time": 3.0 })).await;
    for unused in ["/api/structure-web", "/api/clean-lines"] {
        Mock::given(method("POST"))
            .and(path(unused))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
    }

    let project = create_test_project(&server.uri()).unwrap();
    let config = load_config(project.path()).await.unwrap();
    let backend = HttpBackend::new(&config.global.backend).unwrap();
    let engine = PipelineEngine::new(Arc::new(backend));
    let (tx, _rx) = event_channel();

    let outcome = engine.run("page_1", tx).await;

    let PipelineOutcome::Completed(report) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(report.branch, PipelineBranch::DocumentsOnly);
    assert_durations(
        &report.durations,
        &[
            (StepName::Crawling, None),
            (StepName::Structuring, None),
            (StepName::Line1, None),
            (StepName::Document, Some(10.0)),
            (StepName::Indexing, Some(20.0)),
            (StepName::Update, Some(3.0)),
        ],
    );
}

#[tokio::test]
async fn test_engine_over_http_failure() {
    let server = MockServer::start().await;
    mount_step(&server, "/api/crawl", json!({ "success": true, "execution_time": 5.0 })).await;
    mount_step(
        &server,
        "/api/structure-web",
        json!({ "success": false, "error": "timeout" }),
    )
    .await;

    let engine = PipelineEngine::new(Arc::new(backend_for(&server)));
    let (tx, _rx) = event_channel();

    let outcome = engine.run("page_1", tx).await;

    assert_eq!(
        outcome.failed_stage(),
        Some(FailedStage::Step(StepName::Structuring))
    );
    assert_eq!(outcome.durations().crawling, Some(5.0));
}
