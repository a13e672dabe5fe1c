pub mod actions;
pub mod matcher;
pub mod runner;
pub mod scheduler;

pub use runner::{run_pending_batch, BatchOutcome, JobOutcome};
pub use scheduler::{on_keyword_message, on_new_lead, on_stage_change};
