use async_trait::async_trait;
use serde_json::{json, Value};

use super::{stage_field, Action, ActionContext, ActionError};
use crate::models::automation::ActionType;
use crate::models::lead::Lead;

pub struct UpdateStageAction;

#[async_trait]
impl Action for UpdateStageAction {
    fn kind(&self) -> ActionType {
        ActionType::UpdateStage
    }

    async fn execute(
        &self,
        ctx: &ActionContext<'_>,
        lead: &Lead,
        config: &Value,
    ) -> Result<Value, ActionError> {
        let new_stage =
            stage_field(config, "stage").ok_or(ActionError::MissingConfig("Stage is required"))?;

        let old_stage = ctx.lead_repo.update_lead_stage(lead.id, new_stage).await?;

        Ok(json!({
            "action": "update_stage",
            "old_stage": old_stage,
            "new_stage": new_stage,
            "lead_id": lead.id,
        }))
    }
}
