use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info};

use crate::engine::run_pending_batch;
use crate::state::AppState;

/// Periodic runner invocation. The runner itself is a single pass over
/// currently-due work; this loop is just the cron-equivalent around it.
pub async fn start_background_workers(state: AppState) {
    // Simple single-worker for now. Can be extended to multiple tasks.
    tokio::spawn(async move {
        let poll_interval: u64 = std::env::var("AUTOMATION_POLL_INTERVAL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);
        loop {
            match run_pending_batch(&state).await {
                Ok(outcome) => {
                    if outcome.succeeded + outcome.failed + outcome.skipped > 0 {
                        info!(
                            succeeded = outcome.succeeded,
                            failed = outcome.failed,
                            skipped = outcome.skipped,
                            "worker: automation pass finished"
                        );
                    }
                    sleep(Duration::from_secs(poll_interval)).await;
                }
                Err(e) => {
                    // Store trouble aborts the pass; back off before retrying.
                    error!(error = ?e, "worker: automation pass aborted");
                    sleep(Duration::from_secs(poll_interval.max(5))).await;
                }
            }
        }
    });
}
