use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Job lifecycle. Transitions are monotonic and one-directional:
/// pending -> running -> done | failed. A job never re-enters pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One scheduled, delayed instance of an automation's action, bound to
/// one lead. Created by the scheduler at event time; mutated only by
/// the runner.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AutomationJob {
    pub id: Uuid,
    pub automation_id: Uuid,
    pub lead_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub execute_at: OffsetDateTime,
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl AutomationJob {
    pub fn is_due(&self, now: OffsetDateTime) -> bool {
        self.status == JobStatus::Pending && self.execute_at <= now
    }
}
