//! Maintenance repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::maintenance::{
        CompleteMaintenance, CreateMaintenance, MaintenanceQuery, MaintenanceRecord, MaintenanceStatus,
        UpdateMaintenance,
    },
};

#[derive(Clone)]
pub struct MaintenanceRepository {
    pool: Pool<Postgres>,
}

impl MaintenanceRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: &MaintenanceQuery) -> AppResult<Vec<MaintenanceRecord>> {
        let rows = sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            SELECT * FROM equipment_maintenance
            WHERE ($1::int IS NULL OR equipment_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY scheduled_date DESC NULLS LAST, created_at DESC
            "#,
        )
        .bind(query.equipment_id)
        .bind(query.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<MaintenanceRecord> {
        sqlx::query_as::<_, MaintenanceRecord>("SELECT * FROM equipment_maintenance WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Maintenance record {} not found", id)))
    }

    pub async fn create(&self, data: &CreateMaintenance) -> AppResult<MaintenanceRecord> {
        let row = sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            INSERT INTO equipment_maintenance (
                equipment_id, maintenance_type, status, title, description,
                scheduled_date, cost, provider, performed_by, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(data.equipment_id)
        .bind(data.maintenance_type)
        .bind(MaintenanceStatus::Scheduled)
        .bind(data.title.trim())
        .bind(&data.description)
        .bind(data.scheduled_date)
        .bind(data.cost)
        .bind(&data.provider)
        .bind(&data.performed_by)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(&self, id: i32, data: &UpdateMaintenance) -> AppResult<MaintenanceRecord> {
        sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            UPDATE equipment_maintenance SET
                maintenance_type = COALESCE($2, maintenance_type),
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                scheduled_date = COALESCE($5, scheduled_date),
                cost = COALESCE($6, cost),
                provider = COALESCE($7, provider),
                performed_by = COALESCE($8, performed_by),
                notes = COALESCE($9, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.maintenance_type)
        .bind(data.title.as_deref().map(str::trim))
        .bind(&data.description)
        .bind(data.scheduled_date)
        .bind(data.cost)
        .bind(&data.provider)
        .bind(&data.performed_by)
        .bind(&data.notes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Maintenance record {} not found", id)))
    }

    /// Move to `next`, guarded on the status the caller read so a concurrent change is not overwritten
    pub async fn set_status(
        &self,
        id: i32,
        expected: MaintenanceStatus,
        next: MaintenanceStatus,
        completion: Option<&CompleteMaintenance>,
    ) -> AppResult<MaintenanceRecord> {
        let (cost, performed_by, notes) = match completion {
            Some(c) => (c.cost, c.performed_by.as_deref(), c.notes.as_deref()),
            None => (None, None, None),
        };
        sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            UPDATE equipment_maintenance SET
                status = $3,
                start_date = CASE WHEN $3 = 'in_progress' THEN NOW() ELSE start_date END,
                end_date = CASE WHEN $3 = 'completed' THEN NOW() ELSE end_date END,
                cost = COALESCE($4, cost),
                performed_by = COALESCE($5, performed_by),
                notes = COALESCE($6, notes),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(next)
        .bind(cost)
        .bind(performed_by)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::InvalidTransition(format!(
                "Maintenance record {} is no longer {}",
                id, expected
            ))
        })
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM equipment_maintenance WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Maintenance record {} not found", id)));
        }
        Ok(())
    }
}
