mod add_tag;
mod send_message;
mod update_stage;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::db::lead_repository::LeadRepository;
use crate::models::automation::ActionType;
use crate::models::lead::Lead;
use crate::services::whatsapp::{Messenger, TransportError};

pub use add_tag::AddTagAction;
pub use send_message::SendMessageAction;
pub use update_stage::UpdateStageAction;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Unknown action type: {0}")]
    UnknownAction(String),
    #[error("{0}")]
    MissingConfig(&'static str),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("lead store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Collaborators an action may touch. Actions are the only place the
/// engine mutates external state.
pub struct ActionContext<'a> {
    pub lead_repo: &'a dyn LeadRepository,
    pub messenger: &'a dyn Messenger,
}

/// One capability per action type. Each action validates its own config
/// and performs its own side effect; there is no transactional coupling
/// between actions.
#[async_trait]
pub trait Action: Send + Sync {
    fn kind(&self) -> ActionType;

    async fn execute(
        &self,
        ctx: &ActionContext<'_>,
        lead: &Lead,
        config: &Value,
    ) -> Result<Value, ActionError>;
}

/// Lookup table keyed by action type. The runner dispatches through it
/// and never matches on action types itself, so adding an action means
/// registering it here and nothing else.
pub struct ActionRegistry {
    actions: HashMap<ActionType, Box<dyn Action>>,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        let mut registry = Self {
            actions: HashMap::new(),
        };
        registry.register(Box::new(SendMessageAction));
        registry.register(Box::new(UpdateStageAction));
        registry.register(Box::new(AddTagAction));
        registry
    }
}

impl ActionRegistry {
    pub fn empty() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    pub fn register(&mut self, action: Box<dyn Action>) {
        self.actions.insert(action.kind(), action);
    }

    pub async fn execute(
        &self,
        ctx: &ActionContext<'_>,
        action_type: ActionType,
        lead: &Lead,
        config: &Value,
    ) -> Result<Value, ActionError> {
        let action = self
            .actions
            .get(&action_type)
            .ok_or_else(|| ActionError::UnknownAction(action_type.to_string()))?;
        action.execute(ctx, lead, config).await
    }
}

/// Reads a config field that may arrive as a bare string or as a
/// mapping keyed by `key`. Empty strings count as missing.
pub(crate) fn string_field(config: &Value, key: &str) -> Option<String> {
    let raw = match config {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get(key).and_then(|v| v.as_str()),
        _ => None,
    }?;
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Like `string_field` but normalizes to the canonical integer stage.
/// Accepts a JSON number or a numeric string.
pub(crate) fn stage_field(config: &Value, key: &str) -> Option<i32> {
    let value = match config {
        Value::Object(map) => map.get(key)?,
        other => other,
    };
    match value {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}
