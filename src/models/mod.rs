pub mod automation;
pub mod automation_job;
pub mod automation_log;
pub mod lead;
