use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::db::automation_repository::AutomationRepository;
use crate::models::automation::TriggerType;
use crate::models::automation_job::AutomationJob;
use crate::models::lead::Lead;
use crate::state::AppState;

use super::matcher::matches_trigger;

/// Creates one pending job per matching definition, with
/// `execute_at = now + delay_seconds`.
///
/// Repeated events deliberately create independent jobs; keyword
/// automations fire again for every qualifying message. Store errors
/// propagate so the event producer can decide whether to retry.
pub async fn schedule_for_lead(
    repo: &dyn AutomationRepository,
    lead: &Lead,
    trigger_type: TriggerType,
    now: OffsetDateTime,
) -> Result<Vec<AutomationJob>, sqlx::Error> {
    let candidates = repo
        .list_active_for_trigger(lead.business_id, trigger_type)
        .await?;

    let mut jobs = Vec::new();
    for definition in candidates {
        if !matches_trigger(&definition, lead) {
            continue;
        }
        let execute_at = now + Duration::seconds(definition.delay_seconds.max(0));
        let job = repo.create_job(definition.id, lead.id, execute_at).await?;
        debug!(
            automation_id = %definition.id,
            lead_id = %lead.id,
            %execute_at,
            "scheduled automation job"
        );
        jobs.push(job);
    }
    Ok(jobs)
}

/// Event producer entry point: a lead was just created.
pub async fn on_new_lead(state: &AppState, lead: &Lead) -> Result<Vec<AutomationJob>, sqlx::Error> {
    schedule_for_lead(
        state.automation_repo.as_ref(),
        lead,
        TriggerType::NewLead,
        OffsetDateTime::now_utc(),
    )
    .await
}

/// Event producer entry point: a lead moved to `new_stage`. Matching
/// runs against the new stage, whether or not the caller has already
/// persisted it.
pub async fn on_stage_change(
    state: &AppState,
    lead: &Lead,
    new_stage: i32,
) -> Result<Vec<AutomationJob>, sqlx::Error> {
    let mut lead = lead.clone();
    lead.stage = new_stage;
    schedule_for_lead(
        state.automation_repo.as_ref(),
        &lead,
        TriggerType::StageChange,
        OffsetDateTime::now_utc(),
    )
    .await
}

/// Event producer entry point: an inbound message arrived for the lead.
/// The message text is what keyword conditions are evaluated against.
pub async fn on_keyword_message(
    state: &AppState,
    lead: &Lead,
    message_text: &str,
) -> Result<Vec<AutomationJob>, sqlx::Error> {
    let mut lead = lead.clone();
    lead.last_message = Some(message_text.to_string());
    schedule_for_lead(
        state.automation_repo.as_ref(),
        &lead,
        TriggerType::Keyword,
        OffsetDateTime::now_utc(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock_db::MockAutomationRepository;
    use crate::models::automation::{ActionType, AutomationDefinition};
    use crate::models::automation_job::JobStatus;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use time::macros::datetime;
    use uuid::Uuid;

    fn definition(
        business_id: Uuid,
        trigger_type: TriggerType,
        trigger_value: Option<serde_json::Value>,
        delay_seconds: i64,
        is_active: bool,
    ) -> AutomationDefinition {
        let now = OffsetDateTime::now_utc();
        AutomationDefinition {
            id: Uuid::new_v4(),
            business_id,
            name: "welcome".to_string(),
            trigger_type,
            trigger_value,
            action_type: ActionType::SendMessage,
            action_config: json!({"message": "hi"}),
            delay_seconds,
            is_active,
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn lead(business_id: Uuid) -> Lead {
        let now = OffsetDateTime::now_utc();
        Lead {
            id: Uuid::new_v4(),
            business_id,
            name: "Alba Reyes".to_string(),
            phone: "15559998888".to_string(),
            stage: 1,
            tags: Vec::new(),
            last_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn job_execute_at_is_now_plus_delay_exactly() {
        let business_id = Uuid::new_v4();
        let repo = MockAutomationRepository::default();
        repo.push_automation(definition(business_id, TriggerType::NewLead, None, 300, true));
        let now = datetime!(2026-03-01 09:00:00 UTC);

        let jobs = schedule_for_lead(&repo, &lead(business_id), TriggerType::NewLead, now)
            .await
            .unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].execute_at, now + Duration::seconds(300));
        assert_eq!(jobs[0].status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn inactive_definitions_are_not_scheduled() {
        let business_id = Uuid::new_v4();
        let repo = MockAutomationRepository::default();
        repo.push_automation(definition(business_id, TriggerType::NewLead, None, 0, false));

        let jobs = schedule_for_lead(
            &repo,
            &lead(business_id),
            TriggerType::NewLead,
            OffsetDateTime::now_utc(),
        )
        .await
        .unwrap();

        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn other_businesses_definitions_are_ignored() {
        let repo = MockAutomationRepository::default();
        repo.push_automation(definition(
            Uuid::new_v4(),
            TriggerType::NewLead,
            None,
            0,
            true,
        ));

        let jobs = schedule_for_lead(
            &repo,
            &lead(Uuid::new_v4()),
            TriggerType::NewLead,
            OffsetDateTime::now_utc(),
        )
        .await
        .unwrap();

        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn repeated_keyword_events_create_independent_jobs() {
        let business_id = Uuid::new_v4();
        let repo = MockAutomationRepository::default();
        repo.push_automation(definition(
            business_id,
            TriggerType::Keyword,
            Some(json!("demo")),
            0,
            true,
        ));
        let mut lead = lead(business_id);
        lead.last_message = Some("book a demo please".to_string());

        for _ in 0..2 {
            schedule_for_lead(&repo, &lead, TriggerType::Keyword, OffsetDateTime::now_utc())
                .await
                .unwrap();
        }

        assert_eq!(repo.jobs.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn store_failure_propagates_to_the_event_producer() {
        let repo = MockAutomationRepository::default();
        repo.should_fail.store(true, Ordering::SeqCst);

        let result = schedule_for_lead(
            &repo,
            &lead(Uuid::new_v4()),
            TriggerType::NewLead,
            OffsetDateTime::now_utc(),
        )
        .await;

        assert!(result.is_err());
    }
}
