//! Settings repository: the singleton `inventory_settings` row

use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgConnection, Pool, Postgres};

use crate::{
    error::AppResult,
    models::settings::{format_reference, next_counter, InventorySettings, SettingsData, DEFAULT_REFERENCE_PREFIX},
};

#[derive(Debug, FromRow)]
struct SettingsRow {
    reference_prefix: String,
    reference_counter: i32,
    data: Json<SettingsData>,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<String>,
}

impl From<SettingsRow> for InventorySettings {
    fn from(row: SettingsRow) -> Self {
        InventorySettings {
            reference_prefix: row.reference_prefix,
            reference_counter: row.reference_counter,
            data: row.data.0,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        }
    }
}

const SELECT_SETTINGS: &str = r#"
    SELECT reference_prefix, reference_counter, data, updated_at, updated_by
    FROM inventory_settings WHERE id = 1
"#;

#[derive(Clone)]
pub struct SettingsRepository {
    pool: Pool<Postgres>,
}

impl SettingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert the default row if it does not exist yet
    async fn ensure_row(conn: &mut PgConnection) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_settings (id, reference_prefix, reference_counter, data)
            VALUES (1, $1, 0, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(DEFAULT_REFERENCE_PREFIX)
        .bind(Json(SettingsData::default()))
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Read settings, creating the defaults on first access
    pub async fn get(&self) -> AppResult<InventorySettings> {
        let existing = sqlx::query_as::<_, SettingsRow>(SELECT_SETTINGS)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = existing {
            return Ok(row.into());
        }

        let mut conn = self.pool.acquire().await?;
        Self::ensure_row(&mut conn).await?;
        let row = sqlx::query_as::<_, SettingsRow>(SELECT_SETTINGS)
            .fetch_one(&mut *conn)
            .await?;
        tracing::info!("Created default inventory settings");
        Ok(row.into())
    }

    /// Read and lock the row for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection) -> AppResult<InventorySettings> {
        Self::ensure_row(conn).await?;
        let row = sqlx::query_as::<_, SettingsRow>(&format!("{} FOR UPDATE", SELECT_SETTINGS))
            .fetch_one(conn)
            .await?;
        Ok(row.into())
    }

    /// Write back a locked row
    pub async fn save(&self, conn: &mut PgConnection, settings: &InventorySettings, updated_by: &str) -> AppResult<InventorySettings> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            UPDATE inventory_settings
            SET reference_prefix = $1, reference_counter = $2, data = $3,
                updated_at = NOW(), updated_by = $4
            WHERE id = 1
            RETURNING reference_prefix, reference_counter, data, updated_at, updated_by
            "#,
        )
        .bind(&settings.reference_prefix)
        .bind(settings.reference_counter)
        .bind(Json(&settings.data))
        .bind(updated_by)
        .fetch_one(conn)
        .await?;
        Ok(row.into())
    }

    /// One attempt at allocating the next reference.
    ///
    /// The increment and the read happen under the row lock, so concurrent
    /// callers are serialized and never observe the same counter value.
    pub async fn allocate_reference(&self) -> AppResult<(String, i32)> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_row(&mut *tx).await?;

        let (prefix, counter): (String, i32) = sqlx::query_as(
            "SELECT reference_prefix, reference_counter FROM inventory_settings WHERE id = 1 FOR UPDATE",
        )
        .fetch_one(&mut *tx)
        .await?;

        let next = next_counter(counter)?;
        sqlx::query("UPDATE inventory_settings SET reference_counter = $1 WHERE id = 1")
            .bind(next)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok((format_reference(&prefix, next), next))
    }
}
