//! Maintenance service
//!
//! Records are tracked on their own; starting or completing a maintenance does
//! not change the equipment's status.

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::maintenance::{
        CompleteMaintenance, CreateMaintenance, MaintenanceQuery, MaintenanceRecord, MaintenanceStatus,
        UpdateMaintenance,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct MaintenanceService {
    repository: Repository,
}

impl MaintenanceService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &MaintenanceQuery) -> AppResult<Vec<MaintenanceRecord>> {
        self.repository.maintenance.list(query).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<MaintenanceRecord> {
        self.repository.maintenance.get_by_id(id).await
    }

    pub async fn create(&self, data: &CreateMaintenance) -> AppResult<MaintenanceRecord> {
        data.validate()?;
        self.repository.equipment.get_by_id(data.equipment_id).await?;
        let record = self.repository.maintenance.create(data).await?;
        tracing::info!(
            "Scheduled {} maintenance {} on equipment {}",
            record.maintenance_type,
            record.id,
            record.equipment_id
        );
        Ok(record)
    }

    pub async fn update(&self, id: i32, data: &UpdateMaintenance) -> AppResult<MaintenanceRecord> {
        data.validate()?;
        let current = self.repository.maintenance.get_by_id(id).await?;
        if current.status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "Maintenance record {} is {} and can no longer change",
                id, current.status
            )));
        }
        self.repository.maintenance.update(id, data).await
    }

    pub async fn start(&self, id: i32) -> AppResult<MaintenanceRecord> {
        self.transition(id, MaintenanceStatus::InProgress, None).await
    }

    pub async fn complete(&self, id: i32, data: &CompleteMaintenance) -> AppResult<MaintenanceRecord> {
        self.transition(id, MaintenanceStatus::Completed, Some(data)).await
    }

    pub async fn cancel(&self, id: i32) -> AppResult<MaintenanceRecord> {
        self.transition(id, MaintenanceStatus::Cancelled, None).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.maintenance.delete(id).await
    }

    async fn transition(
        &self,
        id: i32,
        next: MaintenanceStatus,
        completion: Option<&CompleteMaintenance>,
    ) -> AppResult<MaintenanceRecord> {
        let current = self.repository.maintenance.get_by_id(id).await?;
        current.status.transition(next)?;
        let record = self
            .repository
            .maintenance
            .set_status(id, current.status, next, completion)
            .await?;
        tracing::info!("Maintenance {} is now {}", id, record.status);
        Ok(record)
    }
}
