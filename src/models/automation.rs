use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Event classification that activates matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TriggerType {
    NewLead,
    StageChange,
    Keyword,
    Timed,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::NewLead => "new_lead",
            TriggerType::StageChange => "stage_change",
            TriggerType::Keyword => "keyword",
            TriggerType::Timed => "timed",
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ActionType {
    SendMessage,
    UpdateStage,
    AddTag,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::SendMessage => "send_message",
            ActionType::UpdateStage => "update_stage",
            ActionType::AddTag => "add_tag",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured rule: trigger condition plus a delayed action.
///
/// Owned by exactly one business. `trigger_value` is an opaque payload
/// whose shape depends on `trigger_type` (keyword text, target stage).
/// `action_config` holds the key required by `action_type`; a missing
/// key surfaces at execution time, never at scheduling time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AutomationDefinition {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub trigger_type: TriggerType,
    pub trigger_value: Option<serde_json::Value>,
    pub action_type: ActionType,
    pub action_config: serde_json::Value,
    pub delay_seconds: i64,
    pub is_active: bool,
    pub position: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAutomationDefinition {
    pub name: String,
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub trigger_value: Option<serde_json::Value>,
    pub action_type: ActionType,
    pub action_config: serde_json::Value,
    #[serde(default)]
    pub delay_seconds: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub position: i32,
}

fn default_active() -> bool {
    true
}
