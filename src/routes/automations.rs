use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::models::automation::NewAutomationDefinition;
use crate::responses::JsonResponse;
use crate::state::AppState;

pub async fn create_automation(
    State(app_state): State<AppState>,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<NewAutomationDefinition>,
) -> Response {
    if payload.delay_seconds < 0 {
        return JsonResponse::bad_request("delay_seconds must be zero or positive")
            .into_response();
    }

    match app_state
        .automation_repo
        .create_automation(business_id, payload)
        .await
    {
        Ok(automation) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "automation": automation })),
        )
            .into_response(),
        Err(e) => {
            eprintln!("DB error creating automation: {:?}", e);
            JsonResponse::server_error("Failed to create automation").into_response()
        }
    }
}

pub async fn list_automations(
    State(app_state): State<AppState>,
    Path(business_id): Path<Uuid>,
) -> Response {
    match app_state.automation_repo.list_automations(business_id).await {
        Ok(automations) => (
            StatusCode::OK,
            Json(json!({ "success": true, "automations": automations })),
        )
            .into_response(),
        Err(e) => {
            eprintln!("DB error listing automations: {:?}", e);
            JsonResponse::server_error("Failed to list automations").into_response()
        }
    }
}

pub async fn get_automation(
    State(app_state): State<AppState>,
    Path(automation_id): Path<Uuid>,
) -> Response {
    match app_state.automation_repo.find_automation(automation_id).await {
        Ok(Some(automation)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "automation": automation })),
        )
            .into_response(),
        Ok(None) => JsonResponse::not_found("Automation not found").into_response(),
        Err(e) => {
            eprintln!("DB error fetching automation: {:?}", e);
            JsonResponse::server_error("Failed to fetch automation").into_response()
        }
    }
}

pub async fn update_automation(
    State(app_state): State<AppState>,
    Path(automation_id): Path<Uuid>,
    Json(payload): Json<NewAutomationDefinition>,
) -> Response {
    if payload.delay_seconds < 0 {
        return JsonResponse::bad_request("delay_seconds must be zero or positive")
            .into_response();
    }

    match app_state
        .automation_repo
        .update_automation(automation_id, payload)
        .await
    {
        Ok(Some(automation)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "automation": automation })),
        )
            .into_response(),
        Ok(None) => JsonResponse::not_found("Automation not found").into_response(),
        Err(e) => {
            eprintln!("DB error updating automation: {:?}", e);
            JsonResponse::server_error("Failed to update automation").into_response()
        }
    }
}

pub async fn delete_automation(
    State(app_state): State<AppState>,
    Path(automation_id): Path<Uuid>,
) -> Response {
    match app_state.automation_repo.delete_automation(automation_id).await {
        Ok(true) => JsonResponse::success("Automation deleted").into_response(),
        Ok(false) => JsonResponse::not_found("Automation not found").into_response(),
        Err(e) => {
            eprintln!("DB error deleting automation: {:?}", e);
            JsonResponse::server_error("Failed to delete automation").into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct ToggleAutomation {
    pub is_active: bool,
}

/// Deactivation stops future matching only; jobs already scheduled
/// against this automation still execute.
pub async fn toggle_automation(
    State(app_state): State<AppState>,
    Path(automation_id): Path<Uuid>,
    Json(payload): Json<ToggleAutomation>,
) -> Response {
    match app_state
        .automation_repo
        .set_automation_active(automation_id, payload.is_active)
        .await
    {
        Ok(Some(automation)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "automation": automation })),
        )
            .into_response(),
        Ok(None) => JsonResponse::not_found("Automation not found").into_response(),
        Err(e) => {
            eprintln!("DB error toggling automation: {:?}", e);
            JsonResponse::server_error("Failed to toggle automation").into_response()
        }
    }
}

pub async fn list_automation_logs(
    State(app_state): State<AppState>,
    Path(automation_id): Path<Uuid>,
) -> Response {
    match app_state
        .automation_repo
        .list_logs_for_automation(automation_id)
        .await
    {
        Ok(logs) => (
            StatusCode::OK,
            Json(json!({ "success": true, "logs": logs })),
        )
            .into_response(),
        Err(e) => {
            eprintln!("DB error listing automation logs: {:?}", e);
            JsonResponse::server_error("Failed to list automation logs").into_response()
        }
    }
}
