//! Route table and handlers.
//!
//! Request bodies are decoded by hand so malformed JSON surfaces as a 400
//! with the same `{error}` body as every other validation failure.

use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::FutureExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_stream::{StreamExt, wrappers::UnboundedReceiverStream};
use tracing::{error, info, warn};

use compete_core::{
    ChannelSink, ContinueRequest, DiscoveryHandoff, Pipeline, PipelineEvent, ReplaceRequest,
    SilentSink, StartRequest,
};
use compete_shared::{CompeteError, Competitor};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    default_count: usize,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, default_count: usize) -> Self {
        Self {
            pipeline,
            default_count,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze_stream))
        .route("/api/analyze/start", post(analyze_start))
        .route("/api/analyze/replace", post(analyze_replace))
        .route("/api/analyze/continue", post(analyze_continue))
        .route("/api/test", get(connection_test))
        .route("/health", get(health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A [`CompeteError`] rendered as `{error}` with a matching status code.
struct ApiError(CompeteError);

impl From<CompeteError> for ApiError {
    fn from(err: CompeteError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CompeteError::Validation { .. } => StatusCode::BAD_REQUEST,
            CompeteError::EmptyResult { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        (status, Json(json!({ "error": self.0.user_message() }))).into_response()
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError(CompeteError::validation(format!("Invalid request body: {e}"))))
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

/// Terminal message sent when the analysis task dies without reporting.
pub const TASK_PANICKED: &str = "Analysis failed unexpectedly. Please try again.";

/// Run `work` on its own task, feeding the returned receiver.
///
/// A panic inside `work` still ends the stream with an `error` event.
fn spawn_stream<F, Fut>(work: F) -> UnboundedReceiver<PipelineEvent>
where
    F: FnOnce(ChannelSink) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let fallback = tx.clone();
    tokio::spawn(async move {
        let outcome = AssertUnwindSafe(work(ChannelSink::new(tx)))
            .catch_unwind()
            .await;
        if outcome.is_err() {
            error!("analysis task panicked");
            let _ = fallback.send(PipelineEvent::Error {
                message: TASK_PANICKED.to_string(),
            });
        }
    });
    rx
}

/// Wrap the receiving end of a [`ChannelSink`] as an SSE response.
///
/// The stream ends when the producing task drops its sender.
fn sse_response(rx: UnboundedReceiver<PipelineEvent>) -> Response {
    let frames = UnboundedReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(Bytes::from(event.to_sse_frame())));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(frames),
    )
        .into_response()
}

async fn analyze_stream(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let req: StartRequest = parse_body(&body)?;
    let (url, count) = req.validate(state.default_count)?;
    info!(%url, count, "streaming full analysis");

    let pipeline = state.pipeline.clone();
    let rx = spawn_stream(move |sink| async move {
        // Outcome already reached the client as the terminal event.
        let _ = pipeline.stream_full(&url, count, &sink).await;
    });

    Ok(sse_response(rx))
}

async fn analyze_continue(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req: ContinueRequest = parse_body(&body)?;
    let target = req.validate()?;
    info!(url = %target, competitors = req.competitors.len(), "streaming phase 2");

    let pipeline = state.pipeline.clone();
    let rx = spawn_stream(move |sink| async move {
        let _ = pipeline
            .stream_continue(target.as_str(), &req.target_profile, &req.competitors, &sink)
            .await;
    });

    Ok(sse_response(rx))
}

// ---------------------------------------------------------------------------
// JSON endpoints
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct StartResponse {
    success: bool,
    #[serde(flatten)]
    handoff: DiscoveryHandoff,
}

async fn analyze_start(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StartResponse>, ApiError> {
    let req: StartRequest = parse_body(&body)?;
    let (url, count) = req.validate(state.default_count)?;

    let handoff = state.pipeline.start(&url, count, &SilentSink).await?;
    Ok(Json(StartResponse {
        success: true,
        handoff,
    }))
}

#[derive(Serialize)]
struct ReplaceResponse {
    success: bool,
    competitors: Vec<Competitor>,
}

async fn analyze_replace(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ReplaceResponse>, ApiError> {
    let req: ReplaceRequest = parse_body(&body)?;
    let (count, target) = req.validate()?;

    let competitors = state
        .pipeline
        .replace(&req.target_profile, &req.exclude_names, count, target.as_ref())
        .await?;
    Ok(Json(ReplaceResponse {
        success: true,
        competitors,
    }))
}

async fn connection_test(State(state): State<AppState>) -> Response {
    let analyst = state.pipeline.analyst();
    match analyst.check_connection().await {
        Ok(reply) => Json(json!({
            "success": true,
            "response": reply,
            "model": analyst.model(),
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "connection test failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.user_message() })),
            )
                .into_response()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
