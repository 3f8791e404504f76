//! Chat API endpoints, the conversational interface to the pipeline.
//!
//! - `POST /v1/chat`                   run one utterance as a turn
//! - `POST /v1/proposals/:id/confirm`  apply a pending CRUD proposal

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use uuid::Uuid;

use ca_domain::types::{EmployeeId, TurnRequest};

use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Session to continue. Absent means mint a fresh session.
    #[serde(default)]
    pub session_id: Option<String>,
    /// User utterance.
    pub message: String,
    /// Pin the turn to one employee, bypassing name resolution.
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
}

pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> impl IntoResponse {
    // Two turns on one session would interleave reads with the
    // end-of-turn commit; reject the second instead of queueing it.
    // A fresh session has nothing to contend with.
    let _permit = if let Some(session_id) = &body.session_id {
        match state.session_locks.try_acquire(session_id) {
            Ok(permit) => Some(permit),
            Err(busy) => {
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(serde_json::json!({ "error": busy.to_string() })),
                )
                    .into_response();
            }
        }
    } else {
        None
    };

    let mut request = TurnRequest::new(body.message);
    if let Some(session_id) = body.session_id {
        request = request.in_session(session_id);
    }
    if let Some(id) = body.employee_id {
        request = request.targeting(id);
    }

    match state.pipeline.handle_turn(request).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => super::error_response(&e).into_response(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/proposals/:id/confirm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Consume a pending proposal by id and apply it. The conversational
/// path ("confirm" typed into the session) does the same thing through
/// `/v1/chat`; this endpoint exists for UI confirmation buttons.
pub async fn confirm_proposal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.pipeline.confirm_proposal(id).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => super::error_response(&e).into_response(),
    }
}
