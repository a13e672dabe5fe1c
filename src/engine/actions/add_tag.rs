use async_trait::async_trait;
use serde_json::{json, Value};

use super::{string_field, Action, ActionContext, ActionError};
use crate::models::automation::ActionType;
use crate::models::lead::Lead;

pub struct AddTagAction;

#[async_trait]
impl Action for AddTagAction {
    fn kind(&self) -> ActionType {
        ActionType::AddTag
    }

    async fn execute(
        &self,
        ctx: &ActionContext<'_>,
        lead: &Lead,
        config: &Value,
    ) -> Result<Value, ActionError> {
        let tag =
            string_field(config, "tag").ok_or(ActionError::MissingConfig("Tag is required"))?;

        let all_tags = ctx.lead_repo.add_lead_tag(lead.id, &tag).await?;

        Ok(json!({
            "action": "add_tag",
            "tag": tag,
            "all_tags": all_tags,
            "lead_id": lead.id,
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

    fn tagged_lead(tags: &[&str]) -> Lead {
        let now = OffsetDateTime::now_utc();
        Lead {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            name: "Mia Chen".to_string(),
            phone: "15552223333".to_string(),
            stage: 2,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            last_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn adds_tag_and_returns_full_set() {
        let lead_repo = MockLeadRepository::default();
        let messenger = MockMessenger::default();
        let lead = tagged_lead(&["vip"]);
        lead_repo.insert(lead.clone());
        let ctx = ActionContext {
            lead_repo: &lead_repo,
            messenger: &messenger,
        };

        let result = AddTagAction
            .execute(&ctx, &lead, &json!({"tag": "welcomed"}))
            .await
            .unwrap();

        assert_eq!(result["tag"], "welcomed");
        assert_eq!(result["all_tags"], json!(["vip", "welcomed"]));
    }

    #[tokio::test]
    async fn repeated_add_keeps_set_semantics() {
        let lead_repo = MockLeadRepository::default();
        let messenger = MockMessenger::default();
        let lead = tagged_lead(&[]);
        lead_repo.insert(lead.clone());
        let ctx = ActionContext {
            lead_repo: &lead_repo,
            messenger: &messenger,
        };

        for _ in 0..2 {
            AddTagAction
                .execute(&ctx, &lead, &json!({"tag": "welcomed"}))
                .await
                .unwrap();
        }

        assert_eq!(lead_repo.get(lead.id).unwrap().tags, vec!["welcomed"]);
    }

    #[tokio::test]
    async fn missing_tag_key_is_a_config_error() {
        let lead_repo = MockLeadRepository::default();
        let messenger = MockMessenger::default();
        let lead = tagged_lead(&[]);
        lead_repo.insert(lead.clone());
        let ctx = ActionContext {
            lead_repo: &lead_repo,
            messenger: &messenger,
        };

        let err = AddTagAction
            .execute(&ctx, &lead, &json!({"tag": ""}))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Tag is required");
    }
}
