use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::automation_repository::AutomationRepository;
use crate::models::automation::{AutomationDefinition, NewAutomationDefinition, TriggerType};
use crate::models::automation_job::AutomationJob;
use crate::models::automation_log::{AutomationLogEntry, NewAutomationLogEntry};

const AUTOMATION_COLUMNS: &str = "id, business_id, name, trigger_type, trigger_value, action_type, action_config, delay_seconds, is_active, position, created_at, updated_at";
const JOB_COLUMNS: &str =
    "id, automation_id, lead_id, execute_at, status, result, error_message, created_at, updated_at";
const LOG_COLUMNS: &str = "id, automation_id, lead_id, action_type, action_value, status, error_message, metadata, created_at";

pub struct PostgresAutomationRepository {
    pub pool: PgPool,
}

#[async_trait]
impl AutomationRepository for PostgresAutomationRepository {
    async fn create_automation(
        &self,
        business_id: Uuid,
        def: NewAutomationDefinition,
    ) -> Result<AutomationDefinition, sqlx::Error> {
        let row = sqlx::query_as::<_, AutomationDefinition>(&format!(
            r#"
            INSERT INTO automations (business_id, name, trigger_type, trigger_value, action_type, action_config, delay_seconds, is_active, position, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), now())
            RETURNING {AUTOMATION_COLUMNS}
            "#
        ))
        .bind(business_id)
        .bind(&def.name)
        .bind(def.trigger_type)
        .bind(&def.trigger_value)
        .bind(def.action_type)
        .bind(&def.action_config)
        .bind(def.delay_seconds)
        .bind(def.is_active)
        .bind(def.position)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_automations(
        &self,
        business_id: Uuid,
    ) -> Result<Vec<AutomationDefinition>, sqlx::Error> {
        sqlx::query_as::<_, AutomationDefinition>(&format!(
            r#"
            SELECT {AUTOMATION_COLUMNS}
            FROM automations
            WHERE business_id = $1
            ORDER BY position ASC, created_at ASC
            "#
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_automation(
        &self,
        automation_id: Uuid,
    ) -> Result<Option<AutomationDefinition>, sqlx::Error> {
        sqlx::query_as::<_, AutomationDefinition>(&format!(
            "SELECT {AUTOMATION_COLUMNS} FROM automations WHERE id = $1"
        ))
        .bind(automation_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_automation(
        &self,
        automation_id: Uuid,
        def: NewAutomationDefinition,
    ) -> Result<Option<AutomationDefinition>, sqlx::Error> {
        sqlx::query_as::<_, AutomationDefinition>(&format!(
            r#"
            UPDATE automations
            SET name = $2,
                trigger_type = $3,
                trigger_value = $4,
                action_type = $5,
                action_config = $6,
                delay_seconds = $7,
                is_active = $8,
                position = $9,
                updated_at = now()
            WHERE id = $1
            RETURNING {AUTOMATION_COLUMNS}
            "#
        ))
        .bind(automation_id)
        .bind(&def.name)
        .bind(def.trigger_type)
        .bind(&def.trigger_value)
        .bind(def.action_type)
        .bind(&def.action_config)
        .bind(def.delay_seconds)
        .bind(def.is_active)
        .bind(def.position)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_automation(&self, automation_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM automations WHERE id = $1")
            .bind(automation_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_automation_active(
        &self,
        automation_id: Uuid,
        is_active: bool,
    ) -> Result<Option<AutomationDefinition>, sqlx::Error> {
        sqlx::query_as::<_, AutomationDefinition>(&format!(
            r#"
            UPDATE automations
            SET is_active = $2, updated_at = now()
            WHERE id = $1
            RETURNING {AUTOMATION_COLUMNS}
            "#
        ))
        .bind(automation_id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_active_for_trigger(
        &self,
        business_id: Uuid,
        trigger_type: TriggerType,
    ) -> Result<Vec<AutomationDefinition>, sqlx::Error> {
        sqlx::query_as::<_, AutomationDefinition>(&format!(
            r#"
            SELECT {AUTOMATION_COLUMNS}
            FROM automations
            WHERE business_id = $1 AND trigger_type = $2 AND is_active = TRUE
            ORDER BY position ASC, created_at ASC
            "#
        ))
        .bind(business_id)
        .bind(trigger_type)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_job(
        &self,
        automation_id: Uuid,
        lead_id: Uuid,
        execute_at: OffsetDateTime,
    ) -> Result<AutomationJob, sqlx::Error> {
        sqlx::query_as::<_, AutomationJob>(&format!(
            r#"
            INSERT INTO automation_jobs (automation_id, lead_id, execute_at, status, created_at, updated_at)
            VALUES ($1, $2, $3, 'pending', now(), now())
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(automation_id)
        .bind(lead_id)
        .bind(execute_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_job(&self, job_id: Uuid) -> Result<Option<AutomationJob>, sqlx::Error> {
        sqlx::query_as::<_, AutomationJob>(&format!(
            "SELECT {JOB_COLUMNS} FROM automation_jobs WHERE id = $1"
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_due_jobs(
        &self,
        now: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<AutomationJob>, sqlx::Error> {
        sqlx::query_as::<_, AutomationJob>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM automation_jobs
            WHERE status = 'pending' AND execute_at <= $1
            ORDER BY execute_at ASC
            LIMIT $2
            "#
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn claim_job(&self, job_id: Uuid) -> Result<bool, sqlx::Error> {
        // Conditional update: only one concurrent caller sees a row change.
        let result = sqlx::query(
            r#"
            UPDATE automation_jobs
            SET status = 'running', updated_at = now()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn complete_job(&self, job_id: Uuid, result: Value) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE automation_jobs
            SET status = 'done', result = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(result)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fail_job(&self, job_id: Uuid, error_message: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE automation_jobs
            SET status = 'failed', error_message = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_log(
        &self,
        entry: NewAutomationLogEntry,
    ) -> Result<AutomationLogEntry, sqlx::Error> {
        sqlx::query_as::<_, AutomationLogEntry>(&format!(
            r#"
            INSERT INTO automation_logs (automation_id, lead_id, action_type, action_value, status, error_message, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            RETURNING {LOG_COLUMNS}
            "#
        ))
        .bind(entry.automation_id)
        .bind(entry.lead_id)
        .bind(entry.action_type)
        .bind(&entry.action_value)
        .bind(entry.status)
        .bind(&entry.error_message)
        .bind(&entry.metadata)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_logs_for_lead(
        &self,
        lead_id: Uuid,
    ) -> Result<Vec<AutomationLogEntry>, sqlx::Error> {
        sqlx::query_as::<_, AutomationLogEntry>(&format!(
            r#"
            SELECT {LOG_COLUMNS}
            FROM automation_logs
            WHERE lead_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_logs_for_automation(
        &self,
        automation_id: Uuid,
    ) -> Result<Vec<AutomationLogEntry>, sqlx::Error> {
        sqlx::query_as::<_, AutomationLogEntry>(&format!(
            r#"
            SELECT {LOG_COLUMNS}
            FROM automation_logs
            WHERE automation_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(automation_id)
        .fetch_all(&self.pool)
        .await
    }
}
