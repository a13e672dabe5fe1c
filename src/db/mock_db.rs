use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::automation_repository::AutomationRepository;
use crate::db::lead_repository::LeadRepository;
use crate::models::automation::{AutomationDefinition, NewAutomationDefinition, TriggerType};
use crate::models::automation_job::{AutomationJob, JobStatus};
use crate::models::automation_log::{AutomationLogEntry, NewAutomationLogEntry};
use crate::models::lead::{Lead, NewLead};

/// In-memory automation store for tests. `claim_job` takes the store
/// lock for the whole check-and-set, matching the atomicity the
/// Postgres conditional UPDATE provides.
#[derive(Default)]
pub struct MockAutomationRepository {
    pub automations: Mutex<Vec<AutomationDefinition>>,
    pub jobs: Mutex<Vec<AutomationJob>>,
    pub logs: Mutex<Vec<AutomationLogEntry>>,
    pub should_fail: AtomicBool,
}

impl MockAutomationRepository {
    fn guard(&self) -> Result<(), sqlx::Error> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("Mock store failure".into()));
        }
        Ok(())
    }

    pub fn push_automation(&self, def: AutomationDefinition) {
        self.automations.lock().unwrap().push(def);
    }

    pub fn job_status(&self, job_id: Uuid) -> Option<JobStatus> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == job_id)
            .map(|j| j.status)
    }

    fn build_automation(business_id: Uuid, def: NewAutomationDefinition) -> AutomationDefinition {
        let now = OffsetDateTime::now_utc();
        AutomationDefinition {
            id: Uuid::new_v4(),
            business_id,
            name: def.name,
            trigger_type: def.trigger_type,
            trigger_value: def.trigger_value,
            action_type: def.action_type,
            action_config: def.action_config,
            delay_seconds: def.delay_seconds,
            is_active: def.is_active,
            position: def.position,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl AutomationRepository for MockAutomationRepository {
    async fn create_automation(
        &self,
        business_id: Uuid,
        def: NewAutomationDefinition,
    ) -> Result<AutomationDefinition, sqlx::Error> {
        self.guard()?;
        let automation = Self::build_automation(business_id, def);
        self.automations.lock().unwrap().push(automation.clone());
        Ok(automation)
    }

    async fn list_automations(
        &self,
        business_id: Uuid,
    ) -> Result<Vec<AutomationDefinition>, sqlx::Error> {
        self.guard()?;
        let mut list: Vec<AutomationDefinition> = self
            .automations
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.business_id == business_id)
            .cloned()
            .collect();
        list.sort_by_key(|a| a.position);
        Ok(list)
    }

    async fn find_automation(
        &self,
        automation_id: Uuid,
    ) -> Result<Option<AutomationDefinition>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .automations
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == automation_id)
            .cloned())
    }

    async fn update_automation(
        &self,
        automation_id: Uuid,
        def: NewAutomationDefinition,
    ) -> Result<Option<AutomationDefinition>, sqlx::Error> {
        self.guard()?;
        let mut automations = self.automations.lock().unwrap();
        let Some(existing) = automations.iter_mut().find(|a| a.id == automation_id) else {
            return Ok(None);
        };
        existing.name = def.name;
        existing.trigger_type = def.trigger_type;
        existing.trigger_value = def.trigger_value;
        existing.action_type = def.action_type;
        existing.action_config = def.action_config;
        existing.delay_seconds = def.delay_seconds;
        existing.is_active = def.is_active;
        existing.position = def.position;
        existing.updated_at = OffsetDateTime::now_utc();
        Ok(Some(existing.clone()))
    }

    async fn delete_automation(&self, automation_id: Uuid) -> Result<bool, sqlx::Error> {
        self.guard()?;
        let mut automations = self.automations.lock().unwrap();
        let before = automations.len();
        automations.retain(|a| a.id != automation_id);
        Ok(automations.len() < before)
    }

    async fn set_automation_active(
        &self,
        automation_id: Uuid,
        is_active: bool,
    ) -> Result<Option<AutomationDefinition>, sqlx::Error> {
        self.guard()?;
        let mut automations = self.automations.lock().unwrap();
        let Some(existing) = automations.iter_mut().find(|a| a.id == automation_id) else {
            return Ok(None);
        };
        existing.is_active = is_active;
        existing.updated_at = OffsetDateTime::now_utc();
        Ok(Some(existing.clone()))
    }

    async fn list_active_for_trigger(
        &self,
        business_id: Uuid,
        trigger_type: TriggerType,
    ) -> Result<Vec<AutomationDefinition>, sqlx::Error> {
        self.guard()?;
        let mut list: Vec<AutomationDefinition> = self
            .automations
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.business_id == business_id && a.trigger_type == trigger_type && a.is_active
            })
            .cloned()
            .collect();
        list.sort_by_key(|a| a.position);
        Ok(list)
    }

    async fn create_job(
        &self,
        automation_id: Uuid,
        lead_id: Uuid,
        execute_at: OffsetDateTime,
    ) -> Result<AutomationJob, sqlx::Error> {
        self.guard()?;
        let now = OffsetDateTime::now_utc();
        let job = AutomationJob {
            id: Uuid::new_v4(),
            automation_id,
            lead_id,
            execute_at,
            status: JobStatus::Pending,
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        self.jobs.lock().unwrap().push(job.clone());
        Ok(job)
    }

    async fn find_job(&self, job_id: Uuid) -> Result<Option<AutomationJob>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == job_id)
            .cloned())
    }

    async fn list_due_jobs(
        &self,
        now: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<AutomationJob>, sqlx::Error> {
        self.guard()?;
        let mut due: Vec<AutomationJob> = self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.status == JobStatus::Pending && j.execute_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|j| j.execute_at);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn claim_job(&self, job_id: Uuid) -> Result<bool, sqlx::Error> {
        self.guard()?;
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) else {
            return Ok(false);
        };
        if job.status != JobStatus::Pending {
            return Ok(false);
        }
        job.status = JobStatus::Running;
        job.updated_at = OffsetDateTime::now_utc();
        Ok(true)
    }

    async fn complete_job(&self, job_id: Uuid, result: Value) -> Result<(), sqlx::Error> {
        self.guard()?;
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) {
            job.status = JobStatus::Done;
            job.result = Some(result);
            job.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn fail_job(&self, job_id: Uuid, error_message: &str) -> Result<(), sqlx::Error> {
        self.guard()?;
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) {
            job.status = JobStatus::Failed;
            job.error_message = Some(error_message.to_string());
            job.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn insert_log(
        &self,
        entry: NewAutomationLogEntry,
    ) -> Result<AutomationLogEntry, sqlx::Error> {
        self.guard()?;
        let log = AutomationLogEntry {
            id: Uuid::new_v4(),
            automation_id: entry.automation_id,
            lead_id: entry.lead_id,
            action_type: entry.action_type,
            action_value: entry.action_value,
            status: entry.status,
            error_message: entry.error_message,
            metadata: entry.metadata,
            created_at: OffsetDateTime::now_utc(),
        };
        self.logs.lock().unwrap().push(log.clone());
        Ok(log)
    }

    async fn list_logs_for_lead(
        &self,
        lead_id: Uuid,
    ) -> Result<Vec<AutomationLogEntry>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.lead_id == lead_id)
            .cloned()
            .collect())
    }

    async fn list_logs_for_automation(
        &self,
        automation_id: Uuid,
    ) -> Result<Vec<AutomationLogEntry>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.automation_id == automation_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MockLeadRepository {
    pub leads: Mutex<HashMap<Uuid, Lead>>,
    pub should_fail: AtomicBool,
}

impl MockLeadRepository {
    fn guard(&self) -> Result<(), sqlx::Error> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("Mock store failure".into()));
        }
        Ok(())
    }

    pub fn insert(&self, lead: Lead) {
        self.leads.lock().unwrap().insert(lead.id, lead);
    }

    pub fn get(&self, lead_id: Uuid) -> Option<Lead> {
        self.leads.lock().unwrap().get(&lead_id).cloned()
    }
}

#[async_trait]
impl LeadRepository for MockLeadRepository {
    async fn create_lead(&self, business_id: Uuid, lead: NewLead) -> Result<Lead, sqlx::Error> {
        self.guard()?;
        let now = OffsetDateTime::now_utc();
        let lead = Lead {
            id: Uuid::new_v4(),
            business_id,
            name: lead.name,
            phone: lead.phone,
            stage: lead.stage,
            tags: Vec::new(),
            last_message: None,
            created_at: now,
            updated_at: now,
        };
        self.leads.lock().unwrap().insert(lead.id, lead.clone());
        Ok(lead)
    }

    async fn find_lead(&self, lead_id: Uuid) -> Result<Option<Lead>, sqlx::Error> {
        self.guard()?;
        Ok(self.leads.lock().unwrap().get(&lead_id).cloned())
    }

    async fn find_lead_by_phone(
        &self,
        business_id: Uuid,
        phone: &str,
    ) -> Result<Option<Lead>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .leads
            .lock()
            .unwrap()
            .values()
            .find(|l| l.business_id == business_id && l.phone == phone)
            .cloned())
    }

    async fn update_lead_stage(
        &self,
        lead_id: Uuid,
        new_stage: i32,
    ) -> Result<i32, sqlx::Error> {
        self.guard()?;
        let mut leads = self.leads.lock().unwrap();
        let lead = leads.get_mut(&lead_id).ok_or(sqlx::Error::RowNotFound)?;
        let old_stage = lead.stage;
        lead.stage = new_stage;
        lead.updated_at = OffsetDateTime::now_utc();
        Ok(old_stage)
    }

    async fn add_lead_tag(&self, lead_id: Uuid, tag: &str) -> Result<Vec<String>, sqlx::Error> {
        self.guard()?;
        let mut leads = self.leads.lock().unwrap();
        let lead = leads.get_mut(&lead_id).ok_or(sqlx::Error::RowNotFound)?;
        if !lead.tags.iter().any(|t| t == tag) {
            lead.tags.push(tag.to_string());
        }
        lead.updated_at = OffsetDateTime::now_utc();
        Ok(lead.tags.clone())
    }

    async fn record_inbound_message(&self, lead_id: Uuid, text: &str) -> Result<(), sqlx::Error> {
        self.guard()?;
        let mut leads = self.leads.lock().unwrap();
        let lead = leads.get_mut(&lead_id).ok_or(sqlx::Error::RowNotFound)?;
        lead.last_message = Some(text.to_string());
        lead.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}
