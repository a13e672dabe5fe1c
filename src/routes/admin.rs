use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::engine::run_pending_batch;
use crate::responses::JsonResponse;
use crate::state::AppState;

/// Manual batch trigger. Individual job failures are reported in the
/// counts, not as a request failure; only a store error is a 500.
pub async fn run_automations(State(app_state): State<AppState>) -> Response {
    match run_pending_batch(&app_state).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({ "success": true, "outcome": outcome })),
        )
            .into_response(),
        Err(e) => {
            eprintln!("DB error running automation batch: {:?}", e);
            JsonResponse::server_error("Automation batch aborted").into_response()
        }
    }
}
