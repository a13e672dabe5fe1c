use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A prospective customer progressing through pipeline stages.
///
/// `stage` is the canonical integer pipeline-column index. `tags` has
/// set semantics; the repository rejects duplicate inserts.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub phone: String,
    pub stage: i32,
    pub tags: Vec<String>,
    pub last_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLead {
    pub name: String,
    pub phone: String,
    #[serde(default = "default_stage")]
    pub stage: i32,
}

fn default_stage() -> i32 {
    1
}
