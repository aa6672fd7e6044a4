//! Equipment repository for database operations

use sqlx::{types::Json, PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        document::EquipmentDocument,
        equipment::{Assignment, CreateEquipment, Equipment, EquipmentFilters, EquipmentRow, UpdateEquipment},
        location::LocationSnapshot,
    },
};

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Database phase of the filter pipeline, ordered by name
    pub async fn list(&self, filters: &EquipmentFilters, limit: Option<i64>) -> AppResult<Vec<Equipment>> {
        let mut conditions = vec!["is_archived = $1".to_string()];
        let mut idx = 2;

        if !filters.category_id.is_empty() {
            conditions.push(format!("category_id = ANY(${})", idx));
            idx += 1;
        }
        if !filters.status_id.is_empty() {
            conditions.push(format!("status_id = ANY(${})", idx));
            idx += 1;
        }
        if filters.company_id.is_some() {
            conditions.push(format!("(current_location->>'company_id')::int = ${}", idx));
            idx += 1;
        }
        if filters.is_consumable.is_some() {
            conditions.push(format!("is_consumable = ${}", idx));
            idx += 1;
        }
        if filters.assigned_user_id.is_some() {
            conditions.push(format!("current_assignment->>'user_id' = ${}", idx));
            idx += 1;
        }

        let mut query = format!(
            "SELECT * FROM equipment WHERE {} ORDER BY name, id",
            conditions.join(" AND ")
        );
        if limit.is_some() {
            query.push_str(&format!(" LIMIT ${}", idx));
        }

        let mut builder = sqlx::query_as::<_, EquipmentRow>(&query).bind(filters.archived());
        if !filters.category_id.is_empty() {
            builder = builder.bind(&filters.category_id);
        }
        if !filters.status_id.is_empty() {
            builder = builder.bind(&filters.status_id);
        }
        if let Some(company_id) = filters.company_id {
            builder = builder.bind(company_id);
        }
        if let Some(is_consumable) = filters.is_consumable {
            builder = builder.bind(is_consumable);
        }
        if let Some(ref user_id) = filters.assigned_user_id {
            builder = builder.bind(user_id);
        }
        if let Some(limit) = limit {
            builder = builder.bind(limit);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Equipment::from).collect())
    }

    /// Get equipment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, EquipmentRow>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Equipment::from)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Read and lock an equipment row for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, EquipmentRow>("SELECT * FROM equipment WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(Equipment::from)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Create equipment with an already allocated reference
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        data: &CreateEquipment,
        reference: &str,
        location: Option<&LocationSnapshot>,
        created_by: &str,
    ) -> AppResult<Equipment> {
        let row = sqlx::query_as::<_, EquipmentRow>(
            r#"
            INSERT INTO equipment (
                reference, name, description, category_id, status_id, condition_id,
                brand, model, serial_number, current_location, acquisition_date,
                purchase_price, supplier, warranty_end_date, is_consumable,
                quantity, min_quantity, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *
            "#,
        )
        .bind(reference)
        .bind(data.name.trim())
        .bind(&data.description)
        .bind(&data.category_id)
        .bind(&data.status_id)
        .bind(&data.condition_id)
        .bind(&data.brand)
        .bind(&data.model)
        .bind(&data.serial_number)
        .bind(location.map(Json))
        .bind(data.acquisition_date)
        .bind(data.purchase_price)
        .bind(&data.supplier)
        .bind(data.warranty_end_date)
        .bind(data.is_consumable.unwrap_or(false))
        .bind(data.quantity)
        .bind(data.min_quantity)
        .bind(&data.notes)
        .bind(created_by)
        .fetch_one(conn)
        .await?;
        Ok(row.into())
    }

    /// Partial update; `location` replaces the snapshot when given
    pub async fn update(
        &self,
        conn: &mut PgConnection,
        id: i32,
        data: &UpdateEquipment,
        location: Option<&LocationSnapshot>,
    ) -> AppResult<Equipment> {
        let mut sets = vec!["updated_at = NOW()".to_string()];
        let mut idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.description, "description");
        add_field!(data.category_id, "category_id");
        add_field!(data.status_id, "status_id");
        add_field!(data.condition_id, "condition_id");
        add_field!(data.brand, "brand");
        add_field!(data.model, "model");
        add_field!(data.serial_number, "serial_number");
        add_field!(location, "current_location");
        add_field!(data.acquisition_date, "acquisition_date");
        add_field!(data.purchase_price, "purchase_price");
        add_field!(data.supplier, "supplier");
        add_field!(data.warranty_end_date, "warranty_end_date");
        add_field!(data.is_consumable, "is_consumable");
        add_field!(data.quantity, "quantity");
        add_field!(data.min_quantity, "min_quantity");
        add_field!(data.notes, "notes");

        // Stock figures are meaningless once an item stops being a consumable
        if data.is_consumable == Some(false) {
            sets.push("quantity = NULL".to_string());
            sets.push("min_quantity = NULL".to_string());
        }

        let query = format!("UPDATE equipment SET {} WHERE id = $1 RETURNING *", sets.join(", "));

        let mut builder = sqlx::query_as::<_, EquipmentRow>(&query).bind(id);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        if let Some(name) = data.name.as_deref() {
            builder = builder.bind(name.trim());
        }
        bind_field!(data.description);
        bind_field!(data.category_id);
        bind_field!(data.status_id);
        bind_field!(data.condition_id);
        bind_field!(data.brand);
        bind_field!(data.model);
        bind_field!(data.serial_number);
        if let Some(location) = location {
            builder = builder.bind(Json(location));
        }
        bind_field!(data.acquisition_date);
        bind_field!(data.purchase_price);
        bind_field!(data.supplier);
        bind_field!(data.warranty_end_date);
        bind_field!(data.is_consumable);
        bind_field!(data.quantity);
        bind_field!(data.min_quantity);
        bind_field!(data.notes);

        builder
            .fetch_optional(conn)
            .await?
            .map(Equipment::from)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Replace location and assignment, inside the caller's transaction
    pub async fn set_position(
        &self,
        conn: &mut PgConnection,
        id: i32,
        location: Option<&LocationSnapshot>,
        assignment: Option<&Assignment>,
    ) -> AppResult<Equipment> {
        sqlx::query_as::<_, EquipmentRow>(
            r#"
            UPDATE equipment
            SET current_location = $2, current_assignment = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(location.map(Json))
        .bind(assignment.map(Json))
        .fetch_optional(conn)
        .await?
        .map(Equipment::from)
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Soft delete
    pub async fn archive(&self, id: i32, reason: &str) -> AppResult<Equipment> {
        sqlx::query_as::<_, EquipmentRow>(
            r#"
            UPDATE equipment
            SET is_archived = TRUE, archived_reason = $2, archived_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?
        .map(Equipment::from)
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Undo a soft delete, clearing every archive field
    pub async fn restore(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, EquipmentRow>(
            r#"
            UPDATE equipment
            SET is_archived = FALSE, archived_reason = NULL, archived_at = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Equipment::from)
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Hard delete; movements and maintenance rows cascade. Returns the deleted record.
    pub async fn delete(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, EquipmentRow>("DELETE FROM equipment WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Equipment::from)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Write back the embedded document list of a locked row
    pub async fn set_documents(
        &self,
        conn: &mut PgConnection,
        id: i32,
        documents: &[EquipmentDocument],
    ) -> AppResult<()> {
        sqlx::query("UPDATE equipment SET documents = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(Json(documents))
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Write back the photo URL list of a locked row
    pub async fn set_photos(&self, conn: &mut PgConnection, id: i32, photos: &[String]) -> AppResult<()> {
        sqlx::query("UPDATE equipment SET photos = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(photos)
            .execute(conn)
            .await?;
        Ok(())
    }
}
