//! Maintenance records

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceType {
    Preventive,
    Corrective,
    Inspection,
    Calibration,
    Upgrade,
    Cleaning,
}

text_enum!(MaintenanceType {
    Preventive => "preventive",
    Corrective => "corrective",
    Inspection => "inspection",
    Calibration => "calibration",
    Upgrade => "upgrade",
    Cleaning => "cleaning",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

text_enum!(MaintenanceStatus {
    Scheduled => "scheduled",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl MaintenanceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MaintenanceStatus::Completed | MaintenanceStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: MaintenanceStatus) -> bool {
        use MaintenanceStatus::*;
        matches!(
            (self, next),
            (Scheduled, InProgress) | (Scheduled, Cancelled) | (InProgress, Completed) | (InProgress, Cancelled)
        )
    }

    pub fn transition(self, next: MaintenanceStatus) -> AppResult<MaintenanceStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition(format!(
                "Maintenance cannot go from {} to {}",
                self, next
            )))
        }
    }
}

/// Maintenance record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MaintenanceRecord {
    pub id: i32,
    pub equipment_id: i32,
    pub maintenance_type: MaintenanceType,
    pub status: MaintenanceStatus,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub cost: Option<Decimal>,
    pub provider: Option<String>,
    pub performed_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Create maintenance request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMaintenance {
    pub equipment_id: i32,
    pub maintenance_type: MaintenanceType,
    #[validate(length(min = 1, max = 200, message = "Maintenance title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub cost: Option<Decimal>,
    pub provider: Option<String>,
    pub performed_by: Option<String>,
    pub notes: Option<String>,
}

/// Update maintenance request; status changes go through start/complete/cancel
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMaintenance {
    pub maintenance_type: Option<MaintenanceType>,
    #[validate(length(min = 1, max = 200, message = "Maintenance title cannot be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub cost: Option<Decimal>,
    pub provider: Option<String>,
    pub performed_by: Option<String>,
    pub notes: Option<String>,
}

/// Body of the complete action
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CompleteMaintenance {
    #[schema(value_type = Option<String>)]
    pub cost: Option<Decimal>,
    pub performed_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct MaintenanceQuery {
    pub equipment_id: Option<i32>,
    pub status: Option<MaintenanceStatus>,
}
