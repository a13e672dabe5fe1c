use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::engine::{on_new_lead, on_stage_change};
use crate::models::lead::NewLead;
use crate::responses::JsonResponse;
use crate::state::AppState;

pub async fn create_lead(
    State(app_state): State<AppState>,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<NewLead>,
) -> Response {
    let lead = match app_state.lead_repo.create_lead(business_id, payload).await {
        Ok(lead) => lead,
        Err(e) => {
            eprintln!("DB error creating lead: {:?}", e);
            return JsonResponse::server_error("Failed to create lead").into_response();
        }
    };

    let jobs = match on_new_lead(&app_state, &lead).await {
        Ok(jobs) => jobs,
        Err(e) => {
            eprintln!("DB error scheduling new-lead automations: {:?}", e);
            return JsonResponse::server_error("Lead created but automations failed to schedule")
                .into_response();
        }
    };

    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "lead": lead, "jobs_scheduled": jobs.len() })),
    )
        .into_response()
}

#[derive(Deserialize)]
pub struct MoveLeadStage {
    pub stage: i32,
}

pub async fn move_lead_stage(
    State(app_state): State<AppState>,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<MoveLeadStage>,
) -> Response {
    let old_stage = match app_state
        .lead_repo
        .update_lead_stage(lead_id, payload.stage)
        .await
    {
        Ok(old_stage) => old_stage,
        Err(sqlx::Error::RowNotFound) => {
            return JsonResponse::not_found("Lead not found").into_response();
        }
        Err(e) => {
            eprintln!("DB error moving lead stage: {:?}", e);
            return JsonResponse::server_error("Failed to move lead").into_response();
        }
    };

    let lead = match app_state.lead_repo.find_lead(lead_id).await {
        Ok(Some(lead)) => lead,
        Ok(None) => return JsonResponse::not_found("Lead not found").into_response(),
        Err(e) => {
            eprintln!("DB error reloading lead: {:?}", e);
            return JsonResponse::server_error("Failed to move lead").into_response();
        }
    };

    let jobs = match on_stage_change(&app_state, &lead, payload.stage).await {
        Ok(jobs) => jobs,
        Err(e) => {
            eprintln!("DB error scheduling stage-change automations: {:?}", e);
            return JsonResponse::server_error("Lead moved but automations failed to schedule")
                .into_response();
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "old_stage": old_stage,
            "new_stage": payload.stage,
            "jobs_scheduled": jobs.len(),
        })),
    )
        .into_response()
}

pub async fn list_lead_logs(
    State(app_state): State<AppState>,
    Path(lead_id): Path<Uuid>,
) -> Response {
    match app_state.automation_repo.list_logs_for_lead(lead_id).await {
        Ok(logs) => (
            StatusCode::OK,
            Json(json!({ "success": true, "logs": logs })),
        )
            .into_response(),
        Err(e) => {
            eprintln!("DB error listing lead logs: {:?}", e);
            JsonResponse::server_error("Failed to list lead logs").into_response()
        }
    }
}
