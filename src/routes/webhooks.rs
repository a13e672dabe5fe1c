use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::{on_keyword_message, on_new_lead};
use crate::models::lead::NewLead;
use crate::responses::JsonResponse;
use crate::services::whatsapp::verify_webhook_signature;
use crate::state::AppState;

/// Meta webhook verification handshake: echo `hub.challenge` back when
/// the verify token matches.
pub async fn verify_whatsapp_webhook(
    State(app_state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge").cloned().unwrap_or_default();

    if mode == Some("subscribe") && token == Some(app_state.config.whatsapp.verify_token.as_str())
    {
        (StatusCode::OK, challenge).into_response()
    } else {
        JsonResponse::forbidden("Webhook verification failed").into_response()
    }
}

pub async fn receive_whatsapp_webhook(
    State(app_state): State<AppState>,
    Path(business_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !verify_webhook_signature(&app_state.config.whatsapp.app_secret, signature, &body) {
        warn!(%business_id, "rejected webhook with bad signature");
        return JsonResponse::unauthorized("Invalid webhook signature").into_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return JsonResponse::bad_request("Invalid webhook payload").into_response(),
    };

    let Some(message) = extract_inbound_message(&payload) else {
        // Status callbacks and non-text events are acknowledged and dropped.
        return JsonResponse::success("Ignored").into_response();
    };

    let lead = match app_state
        .lead_repo
        .find_lead_by_phone(business_id, &message.from)
        .await
    {
        Ok(Some(lead)) => lead,
        Ok(None) => {
            let new_lead = NewLead {
                name: message.profile_name.clone().unwrap_or_else(|| message.from.clone()),
                phone: message.from.clone(),
                stage: 1,
            };
            let lead = match app_state.lead_repo.create_lead(business_id, new_lead).await {
                Ok(lead) => lead,
                Err(e) => {
                    eprintln!("DB error creating lead from webhook: {:?}", e);
                    return JsonResponse::server_error("Failed to record lead").into_response();
                }
            };
            info!(lead_id = %lead.id, %business_id, "created lead from inbound message");
            if let Err(e) = on_new_lead(&app_state, &lead).await {
                eprintln!("DB error scheduling new-lead automations: {:?}", e);
                return JsonResponse::server_error("Failed to schedule automations")
                    .into_response();
            }
            lead
        }
        Err(e) => {
            eprintln!("DB error looking up lead by phone: {:?}", e);
            return JsonResponse::server_error("Failed to look up lead").into_response();
        }
    };

    if let Err(e) = app_state
        .lead_repo
        .record_inbound_message(lead.id, &message.text)
        .await
    {
        eprintln!("DB error recording inbound message: {:?}", e);
        return JsonResponse::server_error("Failed to record message").into_response();
    }

    let jobs = match on_keyword_message(&app_state, &lead, &message.text).await {
        Ok(jobs) => jobs,
        Err(e) => {
            eprintln!("DB error scheduling keyword automations: {:?}", e);
            return JsonResponse::server_error("Failed to schedule automations").into_response();
        }
    };

    (
        StatusCode::OK,
        Json(json!({ "success": true, "jobs_scheduled": jobs.len() })),
    )
        .into_response()
}

struct InboundMessage {
    from: String,
    text: String,
    profile_name: Option<String>,
}

/// Pulls the first text message out of a Meta webhook envelope
/// (`entry[0].changes[0].value.messages[0]`).
fn extract_inbound_message(payload: &Value) -> Option<InboundMessage> {
    let value = payload.pointer("/entry/0/changes/0/value")?;
    let message = value.pointer("/messages/0")?;
    let from = message.get("from")?.as_str()?.to_string();
    let text = message.pointer("/text/body")?.as_str()?.to_string();
    let profile_name = value
        .pointer("/contacts/0/profile/name")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    Some(InboundMessage {
        from,
        text,
        profile_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_message_and_profile_name() {
        let payload = json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "value": {
                        "contacts": [{ "profile": { "name": "Lee Wong" } }],
                        "messages": [{
                            "from": "15551234567",
                            "type": "text",
                            "text": { "body": "I want a demo" }
                        }]
                    }
                }]
            }]
        });

        let message = extract_inbound_message(&payload).unwrap();
        assert_eq!(message.from, "15551234567");
        assert_eq!(message.text, "I want a demo");
        assert_eq!(message.profile_name.as_deref(), Some("Lee Wong"));
    }

    #[test]
    fn status_callbacks_without_messages_are_ignored() {
        let payload = json!({
            "entry": [{ "changes": [{ "value": { "statuses": [{ "status": "delivered" }] } }] }]
        });
        assert!(extract_inbound_message(&payload).is_none());
    }
}
