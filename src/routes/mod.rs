pub mod admin;
pub mod automations;
pub mod leads;
pub mod webhooks;
