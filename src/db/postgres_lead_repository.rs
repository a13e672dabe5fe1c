use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::lead_repository::LeadRepository;
use crate::models::lead::{Lead, NewLead};

const LEAD_COLUMNS: &str =
    "id, business_id, name, phone, stage, tags, last_message, created_at, updated_at";

pub struct PostgresLeadRepository {
    pub pool: PgPool,
}

#[async_trait]
impl LeadRepository for PostgresLeadRepository {
    async fn create_lead(&self, business_id: Uuid, lead: NewLead) -> Result<Lead, sqlx::Error> {
        sqlx::query_as::<_, Lead>(&format!(
            r#"
            INSERT INTO leads (business_id, name, phone, stage, tags, created_at, updated_at)
            VALUES ($1, $2, $3, $4, '{{}}', now(), now())
            RETURNING {LEAD_COLUMNS}
            "#
        ))
        .bind(business_id)
        .bind(&lead.name)
        .bind(&lead.phone)
        .bind(lead.stage)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_lead(&self, lead_id: Uuid) -> Result<Option<Lead>, sqlx::Error> {
        sqlx::query_as::<_, Lead>(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1"))
            .bind(lead_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_lead_by_phone(
        &self,
        business_id: Uuid,
        phone: &str,
    ) -> Result<Option<Lead>, sqlx::Error> {
        sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE business_id = $1 AND phone = $2"
        ))
        .bind(business_id)
        .bind(phone)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_lead_stage(
        &self,
        lead_id: Uuid,
        new_stage: i32,
    ) -> Result<i32, sqlx::Error> {
        // The subquery snapshots the stage before the update applies.
        let row = sqlx::query(
            r#"
            UPDATE leads l
            SET stage = $2, updated_at = now()
            FROM (SELECT id, stage AS old_stage FROM leads WHERE id = $1 FOR UPDATE) prev
            WHERE l.id = prev.id
            RETURNING prev.old_stage
            "#,
        )
        .bind(lead_id)
        .bind(new_stage)
        .fetch_one(&self.pool)
        .await?;
        row.try_get("old_stage")
    }

    async fn add_lead_tag(&self, lead_id: Uuid, tag: &str) -> Result<Vec<String>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            UPDATE leads
            SET tags = CASE WHEN $2 = ANY(tags) THEN tags ELSE array_append(tags, $2) END,
                updated_at = now()
            WHERE id = $1
            RETURNING tags
            "#,
        )
        .bind(lead_id)
        .bind(tag)
        .fetch_one(&self.pool)
        .await?;
        row.try_get("tags")
    }

    async fn record_inbound_message(&self, lead_id: Uuid, text: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE leads
            SET last_message = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(lead_id)
        .bind(text)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
