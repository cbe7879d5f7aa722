//! Route handlers

use crate::output::{load_statistics, DashboardStats};
use crate::pipeline::{PdfRequest, PipelineOutcome, ProgressEvent, UrlRequest};
use crate::server::{ApiError, AppState};
use crate::storage::{ItemRecord, JobRecord, SqliteStorage, Storage};
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::MutexGuard;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

/// Buffered progress events per extraction stream
const EVENT_BUFFER: usize = 32;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub team_id: Option<String>,
    pub limit: Option<usize>,
}

impl ListParams {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    fn team(&self) -> Option<&str> {
        self.team_id.as_deref().filter(|team| !team.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub team_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub team_id: String,
    pub filename: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    ai_enabled: bool,
}

#[derive(Serialize)]
pub struct JobDetail {
    job: JobRecord,
    items: Vec<ItemRecord>,
}

fn lock_storage(state: &AppState) -> Result<MutexGuard<'_, SqliteStorage>, ApiError> {
    state
        .storage
        .lock()
        .map_err(|_| ApiError::Internal("storage lock poisoned".to_string()))
}

/// Unwraps query parameters, turning a rejection into a JSON error
fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn require_team(team_id: &str) -> Result<(), ApiError> {
    if team_id.trim().is_empty() {
        Err(ApiError::BadRequest("team_id is required".to_string()))
    } else {
        Ok(())
    }
}

fn to_sse_event(event: &ProgressEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|e| {
        format!(
            r#"{{"type":"error","message":"failed to encode event: {}"}}"#,
            e
        )
    });
    Event::default().event(event.event_name()).data(data)
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ai_enabled: state.pipeline.ai_enabled(),
    })
}

/// Streams extraction progress for a URL as server-sent events
pub async fn extract(
    State(state): State<AppState>,
    request: Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Json(request) =
        request.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    require_team(&request.team_id)?;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        pipeline.run_url(request, tx).await;
    });

    let stream = ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(to_sse_event(&event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Processes an uploaded PDF and returns the outcome
pub async fn upload(
    State(state): State<AppState>,
    params: Result<Query<UploadParams>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let params = query_params(params)?;
    require_team(&params.team_id)?;

    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                limit: state.max_upload_bytes,
            }
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    })?;
    if body.is_empty() {
        return Err(ApiError::BadRequest("Upload body is empty".to_string()));
    }

    let request = PdfRequest {
        team_id: params.team_id,
        filename: params.filename,
        bytes: body.to_vec(),
    };

    // Nobody listens to upload progress; the reporter ignores the closed channel
    let (tx, _) = mpsc::channel(1);
    let outcome = state.pipeline.run_pdf(request, tx).await;

    let status = match &outcome {
        PipelineOutcome::Completed { .. } => StatusCode::OK,
        PipelineOutcome::Failed { job_id: None, .. } => StatusCode::BAD_REQUEST,
        PipelineOutcome::Failed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    Ok((status, Json(outcome)).into_response())
}

pub async fn list_jobs(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<JobRecord>>, ApiError> {
    let params = query_params(params)?;
    let storage = lock_storage(&state)?;
    Ok(Json(storage.list_jobs(params.team(), params.limit())?))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobDetail>, ApiError> {
    let storage = lock_storage(&state)?;
    let job = storage.get_job(&job_id)?;
    let items = storage.get_items_for_job(&job_id)?;
    Ok(Json(JobDetail { job, items }))
}

pub async fn list_items(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<ItemRecord>>, ApiError> {
    let params = query_params(params)?;
    let storage = lock_storage(&state)?;
    Ok(Json(storage.list_items(params.team(), params.limit())?))
}

pub async fn stats(
    State(state): State<AppState>,
    params: Result<Query<StatsParams>, QueryRejection>,
) -> Result<Json<DashboardStats>, ApiError> {
    let params = query_params(params)?;
    let storage = lock_storage(&state)?;
    let team = params.team_id.as_deref().filter(|team| !team.is_empty());
    Ok(Json(load_statistics(&*storage, team)?))
}
