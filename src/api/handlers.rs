//! HTTP request handlers

use super::sse::{sse_stream, SseEvent};
use super::types::{
    ActiveResponse, ErrorResponse, ModelInfo, ModelsResponse, SelectRequest, SessionListResponse,
    SessionResponse, SubmitRequest,
};
use super::AppState;
use crate::llm::all_models;
use crate::state_machine::{Submission, ValidationError};
use crate::store::{IntelSnapshot, StoreError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session list and creation
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/reply", post(reply_in_session))
        .route("/api/sessions/:id/intel", get(get_intel))
        // Active selection
        .route("/api/active", get(get_active).put(select_session))
        // Change notifications
        .route("/api/stream", get(stream_events))
        // Model info
        .route("/api/models", get(list_models))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Sessions
// ============================================================

async fn list_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.store.list().await,
        active_session_id: state.store.active().await,
    })
}

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<Response, AppError> {
    let Some(submission) = parse_submission(req)? else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let session = state.store.create_session(submission).await?;
    Ok((StatusCode::CREATED, Json(SessionResponse { session })).into_response())
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state
        .store
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("session not found: {id}")))?;
    Ok(Json(SessionResponse { session }))
}

async fn reply_in_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<Response, AppError> {
    let Some(submission) = parse_submission(req)? else {
        // Still a 404 for an unknown session
        if state.store.get(&id).await.is_none() {
            return Err(AppError::NotFound(format!("session not found: {id}")));
        }
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let session = state.store.reply_in_session(&id, submission).await?;
    Ok(Json(SessionResponse { session }).into_response())
}

async fn get_intel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IntelSnapshot>, AppError> {
    state
        .store
        .intel(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("session not found: {id}")))
}

/// Empty submissions are a silent no-op, so they map to `None`
fn parse_submission(req: SubmitRequest) -> Result<Option<Submission>, AppError> {
    match Submission::parse(req.text, req.image.as_deref()) {
        Ok(submission) => Ok(Some(submission)),
        Err(ValidationError::EmptySubmission) => Ok(None),
        Err(e) => Err(AppError::BadRequest(e.to_string())),
    }
}

// ============================================================
// Active Selection
// ============================================================

async fn get_active(State(state): State<AppState>) -> Json<ActiveResponse> {
    Json(ActiveResponse {
        active_session_id: state.store.active().await,
        active_ops: state.store.session_count().await,
    })
}

async fn select_session(
    State(state): State<AppState>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<ActiveResponse>, AppError> {
    state.store.select_session(req.session_id).await?;
    Ok(get_active(State(state)).await)
}

// ============================================================
// Streaming
// ============================================================

async fn stream_events(State(state): State<AppState>) -> impl IntoResponse {
    let init = SseEvent::Init {
        sessions: state.store.list().await,
        active_session_id: state.store.active().await,
    };
    sse_stream(state.store.clone(), init)
}

// ============================================================
// Model Info
// ============================================================

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let registry = &state.llm_registry;
    let models = all_models()
        .iter()
        .filter_map(|def| {
            registry.get(def.id).map(|service| ModelInfo {
                id: def.id.to_string(),
                description: def.description.to_string(),
                context_window: service.context_window(),
            })
        })
        .collect();

    Json(ModelsResponse {
        models,
        default: registry.default_model_id().to_string(),
    })
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("tokato ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway {
        kind: &'static str,
        message: String,
        retry_after: Option<Duration>,
    },
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::SessionNotFound(_) => AppError::NotFound(e.to_string()),
            StoreError::Busy => AppError::Conflict(e.to_string()),
            StoreError::Analysis(ref analysis) => AppError::BadGateway {
                kind: analysis.kind(),
                retry_after: analysis.retry_after(),
                message: e.to_string(),
            },
            StoreError::Transition(_) | StoreError::TaskFailed(_) => {
                tracing::error!(error = %e, "Store failure");
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::new(msg)),
            AppError::BadGateway {
                kind,
                message,
                retry_after,
            } => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new(message)
                    .with_kind(kind)
                    .with_retry_after(retry_after),
            ),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(msg))
            }
        };

        (status, Json(body)).into_response()
    }
}
