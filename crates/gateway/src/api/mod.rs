pub mod chat;
pub mod employees;
pub mod health;
pub mod sessions;

use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;

use ca_domain::error::Error;

use crate::state::AppState;

/// Build the API router. All conversational traffic goes through the
/// two chat routes; the employee routes are read-only admin surfaces,
/// and the session routes cover transcript reads and turn cancellation.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/v1/chat", post(chat::chat))
        .route("/v1/proposals/:id/confirm", post(chat::confirm_proposal))
        .route("/v1/employees", get(employees::list_employees))
        .route("/v1/employees/:id", get(employees::get_employee))
        .route("/v1/sessions/:id/transcript", get(sessions::get_transcript))
        .route("/v1/sessions/:id/cancel", post(sessions::cancel_turn))
}

/// Map a pipeline error to a status code and JSON body.
///
/// Upstream failures (model or retrieval down) become 503 with a
/// user-renderable message; everything the pipeline could not recover
/// locally is an internal error.
pub(crate) fn error_response(err: &Error) -> (StatusCode, Json<serde_json::Value>) {
    if err.is_upstream() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "error": "The assistant is temporarily unavailable. Please try again shortly.",
                "detail": err.to_string(),
            })),
        );
    }

    let status = match err {
        Error::NotFound(_) | Error::ProposalNotFound(_) => StatusCode::NOT_FOUND,
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Cancelled => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
}
