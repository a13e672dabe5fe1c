use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::automation::ActionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    Failed,
}

/// Append-only audit record of one execution attempt, written in
/// addition to the job's own status update. Job state answers "is this
/// unit of work done"; the log answers "what happened historically".
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AutomationLogEntry {
    pub id: Uuid,
    pub automation_id: Uuid,
    pub lead_id: Uuid,
    pub action_type: ActionType,
    pub action_value: serde_json::Value,
    pub status: LogStatus,
    pub error_message: Option<String>,
    pub metadata: Option<serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAutomationLogEntry {
    pub automation_id: Uuid,
    pub lead_id: Uuid,
    pub action_type: ActionType,
    pub action_value: serde_json::Value,
    pub status: LogStatus,
    pub error_message: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewAutomationLogEntry {
    pub fn success(
        automation_id: Uuid,
        lead_id: Uuid,
        action_type: ActionType,
        action_value: serde_json::Value,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            automation_id,
            lead_id,
            action_type,
            action_value,
            status: LogStatus::Success,
            error_message: None,
            metadata,
        }
    }

    pub fn failure(
        automation_id: Uuid,
        lead_id: Uuid,
        action_type: ActionType,
        action_value: serde_json::Value,
        error_message: String,
    ) -> Self {
        Self {
            automation_id,
            lead_id,
            action_type,
            action_value,
            status: LogStatus::Failed,
            error_message: Some(error_message),
            metadata: None,
        }
    }
}
