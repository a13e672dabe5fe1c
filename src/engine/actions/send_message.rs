use async_trait::async_trait;
use serde_json::{json, Value};

use super::{string_field, Action, ActionContext, ActionError};
use crate::models::automation::ActionType;
use crate::models::lead::Lead;

pub struct SendMessageAction;

#[async_trait]
impl Action for SendMessageAction {
    fn kind(&self) -> ActionType {
        ActionType::SendMessage
    }

    async fn execute(
        &self,
        ctx: &ActionContext<'_>,
        lead: &Lead,
        config: &Value,
    ) -> Result<Value, ActionError> {
        let message = string_field(config, "message")
            .ok_or(ActionError::MissingConfig("Message content is required"))?;

        let receipt = ctx.messenger.send_message(&lead.phone, &message).await?;

        Ok(json!({
            "action": "send_message",
            "message": message,
            "recipient": lead.phone,
            "result": receipt,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock_db::MockLeadRepository;
    use crate::services::whatsapp::MockMessenger;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn lead() -> Lead {
        let now = OffsetDateTime::now_utc();
        Lead {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            name: "Sam Park".to_string(),
            phone: "15551234567".to_string(),
            stage: 1,
            tags: Vec::new(),
            last_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn sends_to_lead_phone_and_reports_recipient() {
        let lead_repo = MockLeadRepository::default();
        let messenger = MockMessenger::default();
        let ctx = ActionContext {
            lead_repo: &lead_repo,
            messenger: &messenger,
        };
        let lead = lead();

        let result = SendMessageAction
            .execute(&ctx, &lead, &json!({"message": "Welcome aboard!"}))
            .await
            .unwrap();

        assert_eq!(result["action"], "send_message");
        assert_eq!(result["recipient"], lead.phone);
        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[(lead.phone, "Welcome aboard!".to_string())]);
    }

    #[tokio::test]
    async fn missing_message_key_is_a_config_error() {
        let lead_repo = MockLeadRepository::default();
        let messenger = MockMessenger::default();
        let ctx = ActionContext {
            lead_repo: &lead_repo,
            messenger: &messenger,
        };

        let err = SendMessageAction
            .execute(&ctx, &lead(), &json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Message content is required");
        assert_eq!(messenger.sent_count(), 0);
    }

    #[tokio::test]
    async fn transport_failure_propagates_provider_message() {
        let lead_repo = MockLeadRepository::default();
        let messenger = MockMessenger::failing("rate limited");
        let ctx = ActionContext {
            lead_repo: &lead_repo,
            messenger: &messenger,
        };

        let err = SendMessageAction
            .execute(&ctx, &lead(), &json!({"message": "hi"}))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("rate limited"));
    }
}
