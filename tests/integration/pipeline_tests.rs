//! Integration tests for the extraction pipeline
//!
//! These run whole URL and PDF requests against an in-memory database,
//! with wiremock standing in for fetched pages and the text-generation API.

mod support;

use chrono::{Duration, Utc};
use kb_ingest::config::{Config, EnhancerConfig};
use kb_ingest::enhance::EnhancementMethod;
use kb_ingest::extract::ContentKind;
use kb_ingest::pipeline::{PdfRequest, PipelineOutcome, UrlRequest};
use kb_ingest::storage::{format_timestamp, Storage};
use kb_ingest::{JobStatus, ProgressEvent};
use rusqlite::{params, Connection};
use serde_json::json;
use support::{
    build_pipeline, build_pipeline_at, drain, progress_values, sample_book, test_config,
};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Fallback Title</title>
    <meta property="og:title" content="Building Reliable Services">
    <meta name="author" content="Ada Lovelace">
</head>
<body>
    <article>
        <p>Reliable software starts with clear ownership of every component.</p>
        <p>Teams that review their code and test their deployments ship fewer outages.</p>
    </article>
</body>
</html>"#;

fn url_request(url: &str, team: &str) -> UrlRequest {
    UrlRequest {
        url: url.to_string(),
        team_id: team.to_string(),
    }
}

fn ai_config(server: &MockServer, key_env: &str) -> Config {
    std::env::set_var(key_env, "test-key");
    let mut config = test_config();
    config.enhancer = EnhancerConfig {
        enabled: true,
        api_base: server.uri(),
        api_key_env: key_env.to_string(),
        ..EnhancerConfig::default()
    };
    config
}

fn terminal_events(events: &[ProgressEvent]) -> Vec<&ProgressEvent> {
    events.iter().filter(|event| event.is_terminal()).collect()
}

fn assert_ends_with_single_terminal(events: &[ProgressEvent]) {
    assert_eq!(terminal_events(events).len(), 1);
    assert!(events.last().unwrap().is_terminal());
}

fn assert_non_decreasing(values: &[u8]) {
    assert!(
        values.windows(2).all(|pair| pair[0] <= pair[1]),
        "progress went backwards: {:?}",
        values
    );
}

#[tokio::test]
async fn test_blog_url_is_fetched_and_completed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/reliable-services"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ARTICLE_HTML, "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.extraction.fetch_pages = true;
    let pipeline = build_pipeline(&config);

    let (tx, rx) = mpsc::channel(64);
    let url = format!("{}/posts/reliable-services", server.uri());
    let outcome = pipeline.run_url(url_request(&url, "team-a"), tx).await;
    let events = drain(rx);

    let PipelineOutcome::Completed {
        job_id,
        items,
        cached,
    } = outcome
    else {
        panic!("expected completion");
    };
    assert!(!cached);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Building Reliable Services");
    assert_eq!(items[0].author.as_deref(), Some("Ada Lovelace"));
    assert_eq!(items[0].content_kind, ContentKind::Article);
    assert_eq!(items[0].enhanced_by, EnhancementMethod::Fallback);
    assert!(items[0].content.contains("clear ownership"));

    let values = progress_values(&events);
    assert_non_decreasing(&values);
    assert_eq!(values.first(), Some(&10));
    assert_eq!(values.last(), Some(&100));
    assert_ends_with_single_terminal(&events);

    let storage = pipeline.storage();
    let storage = storage.lock().unwrap();
    let job = storage.get_job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert_eq!(job.items_extracted, 1);
    assert_eq!(job.source_kind.as_deref(), Some("blog"));
}

#[tokio::test]
async fn test_unreachable_page_falls_back_to_template() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.extraction.fetch_pages = true;
    let pipeline = build_pipeline(&config);

    let (tx, rx) = mpsc::channel(64);
    let url = format!("{}/notes/weekly-update", server.uri());
    let outcome = pipeline.run_url(url_request(&url, "team-a"), tx).await;

    assert!(outcome.is_success());
    let PipelineOutcome::Completed { items, .. } = outcome else {
        unreachable!()
    };
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Weekly Update");
    assert_ends_with_single_terminal(&drain(rx));
}

#[tokio::test]
async fn test_book_source_yields_three_chapters() {
    let pipeline = build_pipeline(&test_config());

    let (tx, rx) = mpsc::channel(64);
    let outcome = pipeline
        .run_url(
            url_request("https://www.gutenberg.org/ebooks/moby-dick", "team-a"),
            tx,
        )
        .await;

    let PipelineOutcome::Completed { items, .. } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(items.len(), 3);
    assert!(items
        .iter()
        .all(|item| item.content_kind == ContentKind::Chapter));
    assert_eq!(
        items.iter().map(|item| item.position).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(items[0].title.starts_with("Chapter 1"));

    let events = drain(rx);
    assert_non_decreasing(&progress_values(&events));
    assert_ends_with_single_terminal(&events);
}

#[tokio::test]
async fn test_invalid_url_creates_no_job() {
    let pipeline = build_pipeline(&test_config());

    let (tx, rx) = mpsc::channel(8);
    let outcome = pipeline
        .run_url(url_request("ftp://example.com/file.txt", "team-a"), tx)
        .await;

    assert!(matches!(
        outcome,
        PipelineOutcome::Failed { job_id: None, .. }
    ));

    let events = drain(rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        ProgressEvent::Error { job_id: None, .. }
    ));

    let storage = pipeline.storage();
    assert!(storage.lock().unwrap().list_jobs(None, 10).unwrap().is_empty());
}

#[tokio::test]
async fn test_fresh_job_is_reused() {
    let pipeline = build_pipeline(&test_config());

    let (tx, _rx) = mpsc::channel(64);
    let first = pipeline
        .run_url(
            url_request("https://example.com/guides/getting-started/", "team-a"),
            tx,
        )
        .await;
    let first_id = first.job_id().unwrap().to_string();

    // Same page after normalization
    let (tx, rx) = mpsc::channel(64);
    let second = pipeline
        .run_url(
            url_request(
                "https://WWW.example.com/guides/getting-started?utm_source=mail",
                "team-a",
            ),
            tx,
        )
        .await;

    let PipelineOutcome::Completed {
        job_id,
        items,
        cached,
    } = second
    else {
        panic!("expected cached completion");
    };
    assert!(cached);
    assert_eq!(job_id, first_id);
    assert_eq!(items.len(), 1);

    // Reuse sends only the terminal event
    let events = drain(rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        ProgressEvent::Complete { cached: true, .. }
    ));

    let storage = pipeline.storage();
    assert_eq!(storage.lock().unwrap().list_jobs(None, 10).unwrap().len(), 1);
}

#[tokio::test]
async fn test_freshness_is_scoped_to_team() {
    let pipeline = build_pipeline(&test_config());
    let url = "https://example.com/guides/getting-started";

    let (tx, _rx) = mpsc::channel(64);
    let first = pipeline.run_url(url_request(url, "team-a"), tx).await;

    let (tx, _rx) = mpsc::channel(64);
    let second = pipeline.run_url(url_request(url, "team-b"), tx).await;

    let PipelineOutcome::Completed { job_id, cached, .. } = second else {
        panic!("expected completion");
    };
    assert!(!cached);
    assert_ne!(Some(job_id.as_str()), first.job_id());

    let storage = pipeline.storage();
    assert_eq!(storage.lock().unwrap().list_jobs(None, 10).unwrap().len(), 2);
}

/// Moves a job's completion time `days` into the past
fn backdate_completion(db_path: &std::path::Path, job_id: &str, days: i64) {
    let conn = Connection::open(db_path).unwrap();
    let completed_at = format_timestamp(Utc::now() - Duration::days(days));
    let updated = conn
        .execute(
            "UPDATE extraction_jobs SET completed_at = ?1 WHERE id = ?2",
            params![completed_at, job_id],
        )
        .unwrap();
    assert_eq!(updated, 1);
}

#[tokio::test]
async fn test_job_outside_freshness_window_is_reextracted() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("kb.db");
    let config = test_config();
    assert_eq!(config.extraction.freshness_days, 7);
    let pipeline = build_pipeline_at(&config, &db_path);
    let url = "https://example.com/guides/getting-started";

    let (tx, _rx) = mpsc::channel(64);
    let first = pipeline.run_url(url_request(url, "team-a"), tx).await;
    let first_id = first.job_id().unwrap().to_string();

    // Six days old is still inside the window
    backdate_completion(&db_path, &first_id, 6);
    let (tx, _rx) = mpsc::channel(64);
    let second = pipeline.run_url(url_request(url, "team-a"), tx).await;
    assert!(matches!(
        &second,
        PipelineOutcome::Completed { cached: true, job_id, .. } if *job_id == first_id
    ));

    backdate_completion(&db_path, &first_id, 8);
    let (tx, rx) = mpsc::channel(64);
    let third = pipeline.run_url(url_request(url, "team-a"), tx).await;

    let PipelineOutcome::Completed {
        job_id,
        items,
        cached,
    } = third
    else {
        panic!("expected completion");
    };
    assert!(!cached);
    assert_ne!(job_id, first_id);
    assert_eq!(items.len(), 1);
    assert_eq!(progress_values(&drain(rx)).last(), Some(&100));

    let storage = pipeline.storage();
    assert_eq!(storage.lock().unwrap().list_jobs(None, 10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_ai_enhancement_is_stored() {
    let server = MockServer::start().await;
    let reply = json!({
        "cleaned_content": "Rust makes systems programming approachable.",
        "summary": "An introduction to Rust.",
        "topics": ["Technology", "Education"],
        "difficulty": "intermediate"
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": reply.to_string() } }]
        })))
        .mount(&server)
        .await;

    let config = ai_config(&server, "KB_INGEST_TEST_AI_KEY_SUCCESS");
    let pipeline = build_pipeline(&config);
    assert!(pipeline.ai_enabled());

    let (tx, _rx) = mpsc::channel(64);
    let outcome = pipeline
        .run_url(url_request("https://rust.substack.com/p/why-rust", "team-a"), tx)
        .await;

    let PipelineOutcome::Completed { items, .. } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.enhanced_by, EnhancementMethod::Ai);
    assert_eq!(item.content, "Rust makes systems programming approachable.");
    assert_eq!(item.summary, "An introduction to Rust.");
    assert_eq!(item.topics, vec!["Technology", "Education"]);
    assert_eq!(item.read_time_minutes, 1);
    assert_eq!(item.author.as_deref(), Some("rust"));
}

#[tokio::test]
async fn test_ai_failure_falls_back_without_failing_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let config = ai_config(&server, "KB_INGEST_TEST_AI_KEY_FAILURE");
    let pipeline = build_pipeline(&config);

    let (tx, rx) = mpsc::channel(64);
    let outcome = pipeline
        .run_url(
            url_request("https://medium.com/@grace/compilers-explained", "team-a"),
            tx,
        )
        .await;

    let PipelineOutcome::Completed { job_id, items, .. } = outcome else {
        panic!("expected completion");
    };
    assert!(items
        .iter()
        .all(|item| item.enhanced_by == EnhancementMethod::Fallback));
    assert!(!items[0].summary.is_empty());
    assert!(!items[0].topics.is_empty());

    let events = drain(rx);
    assert_eq!(progress_values(&events).last(), Some(&100));

    let storage = pipeline.storage();
    let job = storage.lock().unwrap().get_job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_pdf_upload_detects_chapters() {
    let pipeline = build_pipeline(&test_config());

    let (tx, rx) = mpsc::channel(64);
    let request = PdfRequest {
        team_id: "team-a".to_string(),
        filename: "voyage.pdf".to_string(),
        bytes: sample_book(),
    };
    let outcome = pipeline.run_pdf(request, tx).await;

    let PipelineOutcome::Completed { job_id, items, .. } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(items.len(), 2);
    assert!(items[0].title.contains("The Harbor"));
    assert_eq!(items[0].page_start, Some(1));
    assert_eq!(items[0].page_end, Some(2));
    assert!(items[1].title.contains("The Storm"));
    assert_eq!(items[1].page_start, Some(3));
    assert_eq!(items[1].page_end, Some(3));
    assert!(items
        .iter()
        .all(|item| item.content_kind == ContentKind::Chapter));
    assert!(items.iter().all(|item| item.source_ref == "pdf:voyage.pdf"));

    let events = drain(rx);
    assert_non_decreasing(&progress_values(&events));
    assert_ends_with_single_terminal(&events);

    let storage = pipeline.storage();
    let job = storage.lock().unwrap().get_job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.source_ref, "pdf:voyage.pdf");
    assert_eq!(job.source_kind.as_deref(), Some("pdf"));
    assert_eq!(job.source_key, None);
}

#[tokio::test]
async fn test_pdf_uploads_skip_freshness() {
    let pipeline = build_pipeline(&test_config());

    for _ in 0..2 {
        let (tx, _rx) = mpsc::channel(64);
        let request = PdfRequest {
            team_id: "team-a".to_string(),
            filename: "voyage.pdf".to_string(),
            bytes: sample_book(),
        };
        let outcome = pipeline.run_pdf(request, tx).await;
        assert!(matches!(
            outcome,
            PipelineOutcome::Completed { cached: false, .. }
        ));
    }

    let storage = pipeline.storage();
    assert_eq!(storage.lock().unwrap().list_jobs(None, 10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_corrupt_pdf_fails_job() {
    let pipeline = build_pipeline(&test_config());

    let (tx, rx) = mpsc::channel(64);
    let request = PdfRequest {
        team_id: "team-a".to_string(),
        filename: "broken.pdf".to_string(),
        bytes: b"this is not a pdf".to_vec(),
    };
    let outcome = pipeline.run_pdf(request, tx).await;

    let PipelineOutcome::Failed {
        job_id: Some(job_id),
        message,
    } = outcome
    else {
        panic!("expected a failed job");
    };
    assert!(!message.is_empty());

    let events = drain(rx);
    assert_ends_with_single_terminal(&events);
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Error { job_id: Some(_), .. })
    ));

    let storage = pipeline.storage();
    let job = storage.lock().unwrap().get_job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some(message.as_str()));
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn test_pdf_without_filename_is_rejected() {
    let pipeline = build_pipeline(&test_config());

    let (tx, _rx) = mpsc::channel(8);
    let request = PdfRequest {
        team_id: "team-a".to_string(),
        filename: "  ".to_string(),
        bytes: sample_book(),
    };
    let outcome = pipeline.run_pdf(request, tx).await;

    assert!(matches!(
        outcome,
        PipelineOutcome::Failed { job_id: None, .. }
    ));
}

#[tokio::test]
async fn test_closed_receiver_does_not_abort() {
    let pipeline = build_pipeline(&test_config());

    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let outcome = pipeline
        .run_url(
            url_request("https://octocat.github.io/hello-world", "team-a"),
            tx,
        )
        .await;

    let PipelineOutcome::Completed { job_id, items, .. } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(items.len(), 2);

    let storage = pipeline.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(storage.get_job(&job_id).unwrap().status, JobStatus::Completed);
    assert_eq!(storage.get_items_for_job(&job_id).unwrap().len(), 2);
}
