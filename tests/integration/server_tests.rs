//! Integration tests for the HTTP API
//!
//! Requests are sent straight to the router with `tower::ServiceExt::oneshot`;
//! no socket is opened.

mod support;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use kb_ingest::server::{router, AppState};
use serde_json::{json, Value};
use support::{build_pipeline, sample_book, test_config};
use tower::ServiceExt;

const UPLOAD_LIMIT: usize = 64 * 1024;

fn test_app() -> Router {
    let pipeline = build_pipeline(&test_config());
    router(AppState::new(pipeline, UPLOAD_LIMIT))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn extract_request(url: &str, team_id: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/extract")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "url": url, "team_id": team_id }).to_string(),
        ))
        .unwrap()
}

fn upload_request(query: &str, bytes: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/upload?{}", query))
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(Body::from(bytes))
        .unwrap()
}

/// Splits an SSE body into (event name, JSON data) pairs
fn parse_sse(body: &[u8]) -> Vec<(String, Value)> {
    let text = String::from_utf8_lossy(body);
    text.split("\n\n")
        .filter_map(|block| {
            let mut name = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    name = Some(value.trim().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data = Some(value.trim().to_string());
                }
            }
            Some((name?, serde_json::from_str(&data?).ok()?))
        })
        .collect()
}

async fn run_extract(app: &Router, url: &str, team_id: &str) -> Vec<(String, Value)> {
    let (status, body) = send(app, extract_request(url, team_id)).await;
    assert_eq!(status, StatusCode::OK);
    parse_sse(&body)
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ai_enabled"], false);
}

#[tokio::test]
async fn test_extract_streams_progress_events() {
    let app = test_app();
    let events = run_extract(&app, "https://www.gutenberg.org/ebooks/walden", "team-a").await;

    assert!(!events.is_empty());
    for (name, data) in &events {
        assert_eq!(data["type"], name.as_str());
    }

    let progress: Vec<u64> = events
        .iter()
        .filter(|(name, _)| name == "progress")
        .map(|(_, data)| data["progress"].as_u64().unwrap())
        .collect();
    assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(progress.last(), Some(&100));

    let (name, data) = events.last().unwrap();
    assert_eq!(name, "complete");
    assert_eq!(data["cached"], false);
    assert_eq!(data["items"].as_array().unwrap().len(), 3);
    assert_eq!(
        events.iter().filter(|(name, _)| name != "progress").count(),
        1
    );
}

#[tokio::test]
async fn test_extract_invalid_url_streams_error() {
    let app = test_app();
    let events = run_extract(&app, "not a url", "team-a").await;

    assert_eq!(events.len(), 1);
    let (name, data) = &events[0];
    assert_eq!(name, "error");
    assert!(data.get("job_id").is_none());
    assert!(!data["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_extract_requires_team() {
    let app = test_app();
    let (status, body) = send(&app, extract_request("https://example.com/post", " ")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error_type"], "bad_request");
}

fn raw_extract_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/extract")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn assert_bad_request(app: &Router, request: Request<Body>) -> Value {
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).expect("error body should be JSON");
    assert_eq!(body["error_type"], "bad_request");
    assert!(!body["message"].as_str().unwrap().is_empty());
    body
}

#[tokio::test]
async fn test_extract_malformed_json_is_json_error() {
    let app = test_app();
    assert_bad_request(&app, raw_extract_request("{not json")).await;
}

#[tokio::test]
async fn test_extract_missing_team_field_is_json_error() {
    let app = test_app();
    let body = assert_bad_request(
        &app,
        raw_extract_request(r#"{"url": "https://example.com/post"}"#),
    )
    .await;
    assert!(body["message"].as_str().unwrap().contains("team_id"));
}

#[tokio::test]
async fn test_upload_missing_filename_is_json_error() {
    let app = test_app();
    let body = assert_bad_request(&app, upload_request("team_id=team-a", sample_book())).await;
    assert!(body["message"].as_str().unwrap().contains("filename"));
}

#[tokio::test]
async fn test_invalid_list_limit_is_json_error() {
    let app = test_app();
    let request = Request::builder()
        .uri("/api/jobs?limit=lots")
        .body(Body::empty())
        .unwrap();
    assert_bad_request(&app, request).await;
}

#[tokio::test]
async fn test_jobs_items_and_stats_after_extraction() {
    let app = test_app();
    run_extract(&app, "https://example.com/essays/on-tools", "team-a").await;
    run_extract(&app, "https://octocat.github.io/spoon-knife", "team-b").await;

    let (status, jobs) = get_json(&app, "/api/jobs?team_id=team-a").await;
    assert_eq!(status, StatusCode::OK);
    let jobs = jobs.as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["status"], "completed");
    assert_eq!(jobs[0]["progress"], 100);

    let job_id = jobs[0]["id"].as_str().unwrap();
    let (status, detail) = get_json(&app, &format!("/api/jobs/{}", job_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["job"]["id"], job_id);
    assert_eq!(detail["items"].as_array().unwrap().len(), 1);

    let (_, all_jobs) = get_json(&app, "/api/jobs?limit=1").await;
    assert_eq!(all_jobs.as_array().unwrap().len(), 1);

    let (status, items) = get_json(&app, "/api/items?team_id=team-b").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items.as_array().unwrap().len(), 2);

    let (status, stats) = get_json(&app, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_jobs"], 2);
    assert_eq!(stats["total_items"], 3);
    assert_eq!(stats["jobs_by_status"]["completed"], 2);
    assert_eq!(stats["jobs_by_status"]["failed"], 0);

    let (_, team_stats) = get_json(&app, "/api/stats?team_id=team-a").await;
    assert_eq!(team_stats["total_jobs"], 1);
    assert_eq!(team_stats["total_items"], 1);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let app = test_app();
    let (status, body) = get_json(&app, "/api/jobs/does-not-exist").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");
}

#[tokio::test]
async fn test_upload_pdf() {
    let app = test_app();
    let request = upload_request("team_id=team-a&filename=voyage.pdf", sample_book());
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "completed");
    assert_eq!(body["cached"], false);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["content_kind"], "chapter");
    assert_eq!(items[0]["source_ref"], "pdf:voyage.pdf");
}

#[tokio::test]
async fn test_upload_corrupt_pdf_is_unprocessable() {
    let app = test_app();
    let request = upload_request(
        "team_id=team-a&filename=broken.pdf",
        b"%PDF-1.4 truncated".to_vec(),
    );
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "failed");
    assert!(body["job_id"].is_string());

    let (_, jobs) = get_json(&app, "/api/jobs?team_id=team-a").await;
    assert_eq!(jobs[0]["status"], "failed");
}

#[tokio::test]
async fn test_upload_too_large() {
    let app = test_app();
    let request = upload_request(
        "team_id=team-a&filename=huge.pdf",
        vec![b'x'; UPLOAD_LIMIT + 1],
    );
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error_type"], "payload_too_large");
}

#[tokio::test]
async fn test_upload_empty_body() {
    let app = test_app();
    let (status, body) = send(&app, upload_request("team_id=team-a&filename=a.pdf", vec![])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error_type"], "bad_request");
}
