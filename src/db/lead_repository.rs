use async_trait::async_trait;
use uuid::Uuid;

use crate::models::lead::{Lead, NewLead};

/// Externally-owned lead records. The engine only needs lookup plus the
/// two field mutations its actions perform.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn create_lead(&self, business_id: Uuid, lead: NewLead) -> Result<Lead, sqlx::Error>;

    async fn find_lead(&self, lead_id: Uuid) -> Result<Option<Lead>, sqlx::Error>;

    async fn find_lead_by_phone(
        &self,
        business_id: Uuid,
        phone: &str,
    ) -> Result<Option<Lead>, sqlx::Error>;

    /// Moves the lead to `new_stage` and returns the stage it held before.
    async fn update_lead_stage(&self, lead_id: Uuid, new_stage: i32)
        -> Result<i32, sqlx::Error>;

    /// Adds `tag` to the lead's tag set if absent and returns the
    /// resulting set. Never produces duplicates.
    async fn add_lead_tag(&self, lead_id: Uuid, tag: &str) -> Result<Vec<String>, sqlx::Error>;

    /// Records the latest inbound message text on the lead.
    async fn record_inbound_message(&self, lead_id: Uuid, text: &str) -> Result<(), sqlx::Error>;
}
