//! Movements repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::movement::{EquipmentMovement, MovementCategory, MovementEndpoint, MovementQuery, MovementRow, MovementStatus},
};

/// Movement about to be inserted
#[derive(Debug, Clone)]
pub struct NewMovement<'a> {
    pub equipment_id: i32,
    pub movement_type_id: &'a str,
    pub category: MovementCategory,
    pub from: &'a MovementEndpoint,
    pub to: &'a MovementEndpoint,
    pub status: MovementStatus,
    pub requires_approval: bool,
    pub reason: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub expected_return_at: Option<DateTime<Utc>>,
    pub requested_by: &'a str,
    pub requested_by_name: &'a str,
    /// Set when the movement completes immediately
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct MovementsRepository {
    pool: Pool<Postgres>,
}

impl MovementsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert inside the caller's transaction
    pub async fn insert(&self, conn: &mut PgConnection, movement: &NewMovement<'_>) -> AppResult<EquipmentMovement> {
        let row = sqlx::query_as::<_, MovementRow>(
            r#"
            INSERT INTO equipment_movements (
                equipment_id, movement_type_id, movement_category, from_endpoint, to_endpoint,
                status, requires_approval, reason, notes, expected_return_at,
                requested_by, requested_by_name, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(movement.equipment_id)
        .bind(movement.movement_type_id)
        .bind(movement.category)
        .bind(Json(movement.from))
        .bind(Json(movement.to))
        .bind(movement.status)
        .bind(movement.requires_approval)
        .bind(movement.reason)
        .bind(movement.notes)
        .bind(movement.expected_return_at)
        .bind(movement.requested_by)
        .bind(movement.requested_by_name)
        .bind(movement.completed_at)
        .fetch_one(conn)
        .await?;
        Ok(row.into())
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<EquipmentMovement> {
        sqlx::query_as::<_, MovementRow>("SELECT * FROM equipment_movements WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(EquipmentMovement::from)
            .ok_or_else(|| AppError::NotFound(format!("Movement {} not found", id)))
    }

    /// Read and lock a movement for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<EquipmentMovement> {
        sqlx::query_as::<_, MovementRow>("SELECT * FROM equipment_movements WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(EquipmentMovement::from)
            .ok_or_else(|| AppError::NotFound(format!("Movement {} not found", id)))
    }

    /// List movements, newest first
    pub async fn list(&self, query: &MovementQuery) -> AppResult<(Vec<EquipmentMovement>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(50).clamp(1, 200);
        let offset = (page - 1) * per_page;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM equipment_movements
            WHERE ($1::int IS NULL OR equipment_id = $1)
              AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(query.equipment_id)
        .bind(query.status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT * FROM equipment_movements
            WHERE ($1::int IS NULL OR equipment_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.equipment_id)
        .bind(query.status)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(EquipmentMovement::from).collect(), total))
    }

    /// Full history of one equipment, newest first
    pub async fn list_for_equipment(&self, equipment_id: i32) -> AppResult<Vec<EquipmentMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            "SELECT * FROM equipment_movements WHERE equipment_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(equipment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(EquipmentMovement::from).collect())
    }

    /// Mark a locked movement completed after approval
    pub async fn complete(&self, conn: &mut PgConnection, id: i32, approved_by: &str) -> AppResult<EquipmentMovement> {
        let row = sqlx::query_as::<_, MovementRow>(
            r#"
            UPDATE equipment_movements
            SET status = $2, approved_by = $3, approved_at = NOW(), completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(MovementStatus::Completed)
        .bind(approved_by)
        .fetch_one(conn)
        .await?;
        Ok(row.into())
    }

    /// Mark a locked movement rejected
    pub async fn reject(&self, conn: &mut PgConnection, id: i32, reason: &str, rejected_by: &str) -> AppResult<EquipmentMovement> {
        let row = sqlx::query_as::<_, MovementRow>(
            r#"
            UPDATE equipment_movements
            SET status = $2, rejection_reason = $3, approved_by = $4, approved_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(MovementStatus::Rejected)
        .bind(reason)
        .bind(rejected_by)
        .fetch_one(conn)
        .await?;
        Ok(row.into())
    }
}
