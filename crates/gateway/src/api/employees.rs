//! Read-only employee directory endpoints.
//!
//! Mutations never go through here; they go through the proposal flow
//! on `/v1/chat` so every change gets validation and confirmation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};

use ca_domain::types::EmployeeId;

use crate::state::AppState;

/// GET /v1/employees
pub async fn list_employees(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_all().await {
        Ok(employees) => Json(serde_json::json!({
            "count": employees.len(),
            "employees": employees,
        }))
        .into_response(),
        Err(e) => super::error_response(&e).into_response(),
    }
}

/// GET /v1/employees/:id
///
/// Accepts both padded (`000042`) and bare (`42`) id forms.
pub async fn get_employee(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> impl IntoResponse {
    let id = match raw_id.parse::<EmployeeId>() {
        Ok(id) => id,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e })),
            )
                .into_response();
        }
    };

    match state.store.find_by_id(id).await {
        Ok(Some(employee)) => Json(employee).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("no employee with id {id}") })),
        )
            .into_response(),
        Err(e) => super::error_response(&e).into_response(),
    }
}
