use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::db::automation_repository::DUE_JOB_BATCH_SIZE;
use crate::models::automation_job::AutomationJob;
use crate::models::automation_log::NewAutomationLogEntry;
use crate::state::AppState;

use super::actions::ActionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    /// Another runner won the claim; nothing was executed here.
    Skipped,
}

/// Counts for one runner pass. Per-job failures are data, not errors;
/// only a store failure aborts a pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// One pass over currently-due work: fetch pending jobs whose
/// `execute_at` has arrived (earliest first, batch-capped), claim and
/// execute each. Safe to invoke repeatedly; overlapping invocations
/// are correct because the claim is a compare-and-set.
pub async fn run_pending_batch(state: &AppState) -> Result<BatchOutcome, sqlx::Error> {
    let now = OffsetDateTime::now_utc();
    let due = state
        .automation_repo
        .list_due_jobs(now, DUE_JOB_BATCH_SIZE)
        .await?;

    let mut outcome = BatchOutcome::default();
    for job in due {
        match run_job(state, &job).await? {
            JobOutcome::Succeeded => outcome.succeeded += 1,
            JobOutcome::Failed => outcome.failed += 1,
            JobOutcome::Skipped => outcome.skipped += 1,
        }
    }

    if outcome.succeeded + outcome.failed > 0 {
        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "automation batch complete"
        );
    }
    Ok(outcome)
}

/// Executes one job at most once. The pending -> running transition
/// happens before the action so a crash mid-action leaves the job
/// visibly in progress rather than silently pending forever.
///
/// Action errors land in the job's `error_message` and a failure log
/// entry; they are never re-raised. Store errors propagate.
pub async fn run_job(state: &AppState, job: &AutomationJob) -> Result<JobOutcome, sqlx::Error> {
    if !state.automation_repo.claim_job(job.id).await? {
        return Ok(JobOutcome::Skipped);
    }

    let automation = state.automation_repo.find_automation(job.automation_id).await?;
    let lead = state.lead_repo.find_lead(job.lead_id).await?;

    let (automation, lead) = match (automation, lead) {
        (Some(a), Some(l)) => (a, l),
        (automation, _) => {
            let missing = if automation.is_none() {
                "automation definition"
            } else {
                "lead"
            };
            let message = format!("Referenced {missing} no longer exists");
            state.automation_repo.fail_job(job.id, &message).await?;
            // Log only when the definition survives; the entry needs its
            // action type and config.
            if let Some(a) = &automation {
                state
                    .automation_repo
                    .insert_log(NewAutomationLogEntry::failure(
                        a.id,
                        job.lead_id,
                        a.action_type,
                        a.action_config.clone(),
                        message.clone(),
                    ))
                    .await?;
            }
            warn!(job_id = %job.id, %message, "automation job failed");
            return Ok(JobOutcome::Failed);
        }
    };

    let ctx = ActionContext {
        lead_repo: state.lead_repo.as_ref(),
        messenger: state.messenger.as_ref(),
    };

    match state
        .actions
        .execute(&ctx, automation.action_type, &lead, &automation.action_config)
        .await
    {
        Ok(result) => {
            state
                .automation_repo
                .complete_job(job.id, result.clone())
                .await?;
            state
                .automation_repo
                .insert_log(NewAutomationLogEntry::success(
                    automation.id,
                    lead.id,
                    automation.action_type,
                    automation.action_config.clone(),
                    Some(json!({ "result": result })),
                ))
                .await?;
            info!(job_id = %job.id, automation_id = %automation.id, "automation job done");
            Ok(JobOutcome::Succeeded)
        }
        Err(err) => {
            let message = err.to_string();
            state.automation_repo.fail_job(job.id, &message).await?;
            state
                .automation_repo
                .insert_log(NewAutomationLogEntry::failure(
                    automation.id,
                    lead.id,
                    automation.action_type,
                    automation.action_config.clone(),
                    message.clone(),
                ))
                .await?;
            warn!(job_id = %job.id, automation_id = %automation.id, error = %message, "automation job failed");
            Ok(JobOutcome::Failed)
        }
    }
}
