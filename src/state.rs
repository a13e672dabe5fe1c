use crate::config::Config;
use crate::db::{
    automation_repository::AutomationRepository, lead_repository::LeadRepository,
};
use crate::engine::actions::ActionRegistry;
use crate::services::whatsapp::Messenger;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub automation_repo: Arc<dyn AutomationRepository>,
    pub lead_repo: Arc<dyn LeadRepository>,
    pub messenger: Arc<dyn Messenger>,
    pub actions: Arc<ActionRegistry>,
    pub config: Arc<Config>,
}
