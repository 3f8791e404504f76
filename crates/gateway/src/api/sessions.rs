//! Session-scoped endpoints: transcript reads and turn cancellation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::state::AppState;

/// GET /v1/sessions/:id/transcript
///
/// Full audit transcript for one session, oldest line first. A session
/// that never spoke yields an empty list, not a 404; only a deployment
/// without a transcript directory refuses the request.
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let Some(transcripts) = &state.transcripts else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "transcripts are not enabled (set sessions.transcript_dir)",
            })),
        )
            .into_response();
    };

    match transcripts.read(&session_id).await {
        Ok(lines) => Json(serde_json::json!({
            "session_id": session_id,
            "count": lines.len(),
            "lines": lines,
        }))
        .into_response(),
        Err(e) => super::error_response(&e).into_response(),
    }
}

/// POST /v1/sessions/:id/cancel
///
/// Signal the cancel token of the session's in-flight turn. The turn
/// stops at its next model or retrieval checkpoint and commits no
/// session state. 404 when nothing is running for the session.
pub async fn cancel_turn(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    if state.pipeline.cancel(&session_id) {
        Json(serde_json::json!({
            "session_id": session_id,
            "cancelled": true,
        }))
        .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "no turn in flight for this session" })),
        )
            .into_response()
    }
}
