pub mod automation_repository;
pub mod lead_repository;
pub mod mock_db;
pub mod postgres_automation_repository;
pub mod postgres_lead_repository;
