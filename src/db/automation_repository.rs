use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::automation::{AutomationDefinition, NewAutomationDefinition, TriggerType};
use crate::models::automation_job::AutomationJob;
use crate::models::automation_log::{AutomationLogEntry, NewAutomationLogEntry};

/// Maximum number of due jobs pulled by a single runner pass.
pub const DUE_JOB_BATCH_SIZE: i64 = 100;

#[async_trait]
pub trait AutomationRepository: Send + Sync {
    async fn create_automation(
        &self,
        business_id: Uuid,
        def: NewAutomationDefinition,
    ) -> Result<AutomationDefinition, sqlx::Error>;

    async fn list_automations(
        &self,
        business_id: Uuid,
    ) -> Result<Vec<AutomationDefinition>, sqlx::Error>;

    async fn find_automation(
        &self,
        automation_id: Uuid,
    ) -> Result<Option<AutomationDefinition>, sqlx::Error>;

    async fn update_automation(
        &self,
        automation_id: Uuid,
        def: NewAutomationDefinition,
    ) -> Result<Option<AutomationDefinition>, sqlx::Error>;

    async fn delete_automation(&self, automation_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn set_automation_active(
        &self,
        automation_id: Uuid,
        is_active: bool,
    ) -> Result<Option<AutomationDefinition>, sqlx::Error>;

    /// Active definitions for one business whose trigger type equals the
    /// event's. Extra-condition filtering happens in the matcher, not here.
    async fn list_active_for_trigger(
        &self,
        business_id: Uuid,
        trigger_type: TriggerType,
    ) -> Result<Vec<AutomationDefinition>, sqlx::Error>;

    async fn create_job(
        &self,
        automation_id: Uuid,
        lead_id: Uuid,
        execute_at: OffsetDateTime,
    ) -> Result<AutomationJob, sqlx::Error>;

    async fn find_job(&self, job_id: Uuid) -> Result<Option<AutomationJob>, sqlx::Error>;

    /// Pending jobs with `execute_at <= now`, earliest-due first, capped
    /// at `limit`.
    async fn list_due_jobs(
        &self,
        now: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<AutomationJob>, sqlx::Error>;

    /// Atomic pending -> running transition. Returns true iff this caller
    /// won the claim; concurrent callers losing it must skip the job.
    /// This compare-and-set is the one correctness-critical concurrency
    /// primitive in the engine.
    async fn claim_job(&self, job_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn complete_job(&self, job_id: Uuid, result: Value) -> Result<(), sqlx::Error>;

    async fn fail_job(&self, job_id: Uuid, error_message: &str) -> Result<(), sqlx::Error>;

    async fn insert_log(
        &self,
        entry: NewAutomationLogEntry,
    ) -> Result<AutomationLogEntry, sqlx::Error>;

    async fn list_logs_for_lead(
        &self,
        lead_id: Uuid,
    ) -> Result<Vec<AutomationLogEntry>, sqlx::Error>;

    async fn list_logs_for_automation(
        &self,
        automation_id: Uuid,
    ) -> Result<Vec<AutomationLogEntry>, sqlx::Error>;
}
