//! Locations repository: companies, sites and rooms

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::location::{
        snapshot_from, Company, CreateCompany, CreateRoom, CreateSite, LocationLevel, LocationRef,
        LocationSnapshot, Room, Site, UpdateCompany, UpdateRoom, UpdateSite,
    },
};

#[derive(Clone)]
pub struct LocationsRepository {
    pool: Pool<Postgres>,
}

impl LocationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // ---- Companies ----

    pub async fn list_companies(&self, include_inactive: bool) -> AppResult<Vec<Company>> {
        let rows = sqlx::query_as::<_, Company>(
            "SELECT * FROM companies WHERE ($1 OR is_active) ORDER BY name, id",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_company(&self, id: i32) -> AppResult<Company> {
        let mut conn = self.pool.acquire().await?;
        self.find_company(&mut *conn, id).await
    }

    /// Read a company on the caller's connection
    pub async fn find_company(&self, conn: &mut PgConnection, id: i32) -> AppResult<Company> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Company {} not found", id)))
    }

    pub async fn create_company(&self, data: &CreateCompany) -> AppResult<Company> {
        let row = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, company_type, allows_equipment_sharing, requires_transfer_approval, notes)
            VALUES ($1, COALESCE($2, 'media'), COALESCE($3, TRUE), COALESCE($4, FALSE), $5)
            RETURNING *
            "#,
        )
        .bind(data.name.trim())
        .bind(data.company_type)
        .bind(data.allows_equipment_sharing)
        .bind(data.requires_transfer_approval)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_company(&self, conn: &mut PgConnection, id: i32, data: &UpdateCompany) -> AppResult<Company> {
        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies SET
                name = COALESCE($2, name),
                company_type = COALESCE($3, company_type),
                allows_equipment_sharing = COALESCE($4, allows_equipment_sharing),
                requires_transfer_approval = COALESCE($5, requires_transfer_approval),
                notes = COALESCE($6, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(data.company_type)
        .bind(data.allows_equipment_sharing)
        .bind(data.requires_transfer_approval)
        .bind(&data.notes)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Company {} not found", id)))
    }

    // ---- Sites ----

    pub async fn list_sites(&self, company_id: Option<i32>, include_inactive: bool) -> AppResult<Vec<Site>> {
        let rows = sqlx::query_as::<_, Site>(
            r#"
            SELECT * FROM sites
            WHERE ($1::int IS NULL OR company_id = $1) AND ($2 OR is_active)
            ORDER BY name, id
            "#,
        )
        .bind(company_id)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_site(&self, id: i32) -> AppResult<Site> {
        sqlx::query_as::<_, Site>("SELECT * FROM sites WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Site {} not found", id)))
    }

    pub async fn create_site(&self, data: &CreateSite) -> AppResult<Site> {
        let row = sqlx::query_as::<_, Site>(
            r#"
            INSERT INTO sites (company_id, name, address, city, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.company_id)
        .bind(data.name.trim())
        .bind(&data.address)
        .bind(&data.city)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_site(&self, conn: &mut PgConnection, id: i32, data: &UpdateSite) -> AppResult<Site> {
        sqlx::query_as::<_, Site>(
            r#"
            UPDATE sites SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                city = COALESCE($4, city),
                notes = COALESCE($5, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(&data.address)
        .bind(&data.city)
        .bind(&data.notes)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Site {} not found", id)))
    }

    // ---- Rooms ----

    pub async fn list_rooms(&self, site_id: Option<i32>, include_inactive: bool) -> AppResult<Vec<Room>> {
        let rows = sqlx::query_as::<_, Room>(
            r#"
            SELECT * FROM rooms
            WHERE ($1::int IS NULL OR site_id = $1) AND ($2 OR is_active)
            ORDER BY name, id
            "#,
        )
        .bind(site_id)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_room(&self, id: i32) -> AppResult<Room> {
        sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Room {} not found", id)))
    }

    pub async fn create_room(&self, data: &CreateRoom) -> AppResult<Room> {
        let row = sqlx::query_as::<_, Room>(
            r#"
            INSERT INTO rooms (site_id, name, floor, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(data.site_id)
        .bind(data.name.trim())
        .bind(&data.floor)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_room(&self, conn: &mut PgConnection, id: i32, data: &UpdateRoom) -> AppResult<Room> {
        sqlx::query_as::<_, Room>(
            r#"
            UPDATE rooms SET
                name = COALESCE($2, name),
                floor = COALESCE($3, floor),
                notes = COALESCE($4, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(&data.floor)
        .bind(&data.notes)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Room {} not found", id)))
    }

    // ---- Shared ----

    fn table(level: LocationLevel) -> &'static str {
        match level {
            LocationLevel::Company => "companies",
            LocationLevel::Site => "sites",
            LocationLevel::Room => "rooms",
        }
    }

    /// Lock a location row for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, level: LocationLevel, id: i32) -> AppResult<()> {
        let query = format!("SELECT id FROM {} WHERE id = $1 FOR UPDATE", Self::table(level));
        sqlx::query_scalar::<_, i32>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", level.label(), id)))
    }

    /// Soft delete; returns false if the row does not exist
    pub async fn set_inactive(&self, conn: &mut PgConnection, level: LocationLevel, id: i32) -> AppResult<bool> {
        let query = format!(
            "UPDATE {} SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
            Self::table(level)
        );
        let result = sqlx::query(&query).bind(id).execute(conn).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Equipment whose current location references the id, counting at most `cap`
    pub async fn count_equipment_at(&self, conn: &mut PgConnection, level: LocationLevel, id: i32, cap: i64) -> AppResult<i64> {
        let key = match level {
            LocationLevel::Company => "company_id",
            LocationLevel::Site => "site_id",
            LocationLevel::Room => "room_id",
        };
        let query = format!(
            r#"
            SELECT COUNT(*) FROM (
                SELECT 1 FROM equipment
                WHERE (current_location->>'{}')::int = $1
                LIMIT $2
            ) capped
            "#,
            key
        );
        let count: i64 = sqlx::query_scalar(&query)
            .bind(id)
            .bind(cap)
            .fetch_one(conn)
            .await?;
        Ok(count)
    }

    /// Active children of a location, counting at most `cap`
    pub async fn count_active_children(&self, conn: &mut PgConnection, level: LocationLevel, id: i32, cap: i64) -> AppResult<i64> {
        let (table, parent) = match level {
            LocationLevel::Company => ("sites", "company_id"),
            LocationLevel::Site => ("rooms", "site_id"),
            LocationLevel::Room => return Ok(0),
        };
        let query = format!(
            r#"
            SELECT COUNT(*) FROM (
                SELECT 1 FROM {} WHERE {} = $1 AND is_active LIMIT $2
            ) capped
            "#,
            table, parent
        );
        let count: i64 = sqlx::query_scalar(&query)
            .bind(id)
            .bind(cap)
            .fetch_one(conn)
            .await?;
        Ok(count)
    }

    /// Build a location snapshot from ids; the only place snapshots are produced
    pub async fn resolve(&self, location: LocationRef) -> AppResult<LocationSnapshot> {
        let mut conn = self.pool.acquire().await?;
        Self::resolve_with(&mut *conn, location, "").await
    }

    /// Like `resolve`, on the caller's transaction; the rows stay share-locked
    /// until it ends and cannot be deactivated meanwhile
    pub async fn resolve_locked(&self, conn: &mut PgConnection, location: LocationRef) -> AppResult<LocationSnapshot> {
        Self::resolve_with(conn, location, " FOR SHARE").await
    }

    async fn resolve_with(conn: &mut PgConnection, location: LocationRef, lock: &str) -> AppResult<LocationSnapshot> {
        let company = sqlx::query_as::<_, Company>(&format!("SELECT * FROM companies WHERE id = $1{}", lock))
            .bind(location.company_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Company {} not found", location.company_id)))?;
        let site = sqlx::query_as::<_, Site>(&format!("SELECT * FROM sites WHERE id = $1{}", lock))
            .bind(location.site_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Site {} not found", location.site_id)))?;
        let room = match location.room_id {
            Some(room_id) => Some(
                sqlx::query_as::<_, Room>(&format!("SELECT * FROM rooms WHERE id = $1{}", lock))
                    .bind(room_id)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Room {} not found", room_id)))?,
            ),
            None => None,
        };
        snapshot_from(&company, &site, room.as_ref())
    }

    /// Rewrite the cached name in every equipment snapshot pointing at a location
    pub async fn refresh_snapshot_names(&self, conn: &mut PgConnection, level: LocationLevel, id: i32, name: &str) -> AppResult<u64> {
        let (id_key, name_key) = match level {
            LocationLevel::Company => ("company_id", "company_name"),
            LocationLevel::Site => ("site_id", "site_name"),
            LocationLevel::Room => ("room_id", "room_name"),
        };
        let query = format!(
            r#"
            UPDATE equipment
            SET current_location = jsonb_set(current_location, '{{{name_key}}}', to_jsonb($2::text))
            WHERE (current_location->>'{id_key}')::int = $1
              AND current_location->>'{name_key}' IS DISTINCT FROM $2
            "#,
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(name)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
