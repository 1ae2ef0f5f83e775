use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::{ApiErrorBody, ChatRequest, ExchangeResponse, InfoResponse, SessionResponse};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::{sessions::SharedSession, AppState};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("session {0} not found")]
    SessionNotFound(Uuid),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        };

        (
            status,
            Json(ApiErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

fn session(state: &AppState, slug: Uuid) -> Result<SharedSession, ApiError> {
    state
        .sessions
        .get(slug)
        .ok_or(ApiError::SessionNotFound(slug))
}

pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(state.info.as_ref().clone())
}

pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let slug = state.sessions.create();
    info!(%slug, live = state.sessions.len(), "session started");

    (
        StatusCode::CREATED,
        Json(SessionResponse {
            slug,
            turns: vec![],
        }),
    )
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(slug): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = session(&state, slug)?;
    let session = session.lock().await;

    Ok(Json(SessionResponse {
        slug,
        turns: session.turns().to_vec(),
    }))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(slug): Path<Uuid>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ExchangeResponse>, ApiError> {
    let session = session(&state, slug)?;
    let mut session = session.lock().await;

    let sources = state
        .controller
        .submit(&mut session, &body.message)
        .await
        .map(|reply| reply.sources)
        .unwrap_or_default();

    Ok(Json(ExchangeResponse {
        slug,
        turns: session.turns().to_vec(),
        sources,
    }))
}

pub async fn reset_session(
    State(state): State<AppState>,
    Path(slug): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = session(&state, slug)?;
    let mut session = session.lock().await;
    state.controller.reset(&mut session);

    Ok(Json(SessionResponse {
        slug,
        turns: vec![],
    }))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(slug): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.sessions.remove(slug) {
        return Err(ApiError::SessionNotFound(slug));
    }
    info!(%slug, live = state.sessions.len(), "session ended");

    Ok(StatusCode::NO_CONTENT)
}
