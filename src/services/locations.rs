//! Locations service: hierarchy management and the dependency checker

use sqlx::PgConnection;
use validator::Validate;

use crate::{
    config::InventoryConfig,
    error::{AppError, AppResult},
    models::location::{
        Company, CreateCompany, CreateRoom, CreateSite, LocationDependencies, LocationLevel, LocationQuery,
        LocationRef, LocationSnapshot, Room, Site, UpdateCompany, UpdateRoom, UpdateSite,
    },
    repository::Repository,
};

use super::events::{ChangeFeed, InventoryEvent};

#[derive(Clone)]
pub struct LocationsService {
    repository: Repository,
    feed: ChangeFeed,
    dependency_cap: i64,
}

impl LocationsService {
    pub fn new(repository: Repository, feed: ChangeFeed, config: &InventoryConfig) -> Self {
        Self {
            repository,
            feed,
            dependency_cap: config.dependency_check_cap.max(1),
        }
    }

    /// Resolve ids to a snapshot, checking tree shape and active state
    pub async fn resolve(&self, location: LocationRef) -> AppResult<LocationSnapshot> {
        self.repository.locations.resolve(location).await
    }

    /// Resolve inside a transaction that is about to store the snapshot
    pub async fn resolve_locked(&self, conn: &mut PgConnection, location: LocationRef) -> AppResult<LocationSnapshot> {
        self.repository.locations.resolve_locked(conn, location).await
    }

    // ---- Companies ----

    pub async fn list_companies(&self, query: &LocationQuery) -> AppResult<Vec<Company>> {
        self.repository.locations.list_companies(query.include_inactive).await
    }

    pub async fn get_company(&self, id: i32) -> AppResult<Company> {
        self.repository.locations.get_company(id).await
    }

    pub async fn create_company(&self, data: &CreateCompany) -> AppResult<Company> {
        data.validate()?;
        let company = self.repository.locations.create_company(data).await?;
        tracing::info!("Created company {} '{}'", company.id, company.name);
        Ok(company)
    }

    pub async fn update_company(&self, id: i32, data: &UpdateCompany) -> AppResult<Company> {
        data.validate()?;
        let mut tx = self.repository.begin().await?;
        let company = self.repository.locations.update_company(&mut *tx, id, data).await?;
        let refreshed = match data.name {
            Some(_) => self.refresh_names(&mut *tx, LocationLevel::Company, id, &company.name).await?,
            None => 0,
        };
        tx.commit().await?;
        self.announce_refresh(LocationLevel::Company, refreshed);
        Ok(company)
    }

    // ---- Sites ----

    pub async fn list_sites(&self, query: &LocationQuery) -> AppResult<Vec<Site>> {
        self.repository
            .locations
            .list_sites(query.company_id, query.include_inactive)
            .await
    }

    pub async fn get_site(&self, id: i32) -> AppResult<Site> {
        self.repository.locations.get_site(id).await
    }

    pub async fn create_site(&self, data: &CreateSite) -> AppResult<Site> {
        data.validate()?;
        let company = self.repository.locations.get_company(data.company_id).await?;
        if !company.is_active {
            return Err(AppError::BusinessRule(format!(
                "Company {} is no longer active",
                company.id
            )));
        }
        let site = self.repository.locations.create_site(data).await?;
        tracing::info!("Created site {} '{}' in company {}", site.id, site.name, company.id);
        Ok(site)
    }

    pub async fn update_site(&self, id: i32, data: &UpdateSite) -> AppResult<Site> {
        data.validate()?;
        let mut tx = self.repository.begin().await?;
        let site = self.repository.locations.update_site(&mut *tx, id, data).await?;
        let refreshed = match data.name {
            Some(_) => self.refresh_names(&mut *tx, LocationLevel::Site, id, &site.name).await?,
            None => 0,
        };
        tx.commit().await?;
        self.announce_refresh(LocationLevel::Site, refreshed);
        Ok(site)
    }

    // ---- Rooms ----

    pub async fn list_rooms(&self, query: &LocationQuery) -> AppResult<Vec<Room>> {
        self.repository
            .locations
            .list_rooms(query.site_id, query.include_inactive)
            .await
    }

    pub async fn get_room(&self, id: i32) -> AppResult<Room> {
        self.repository.locations.get_room(id).await
    }

    pub async fn create_room(&self, data: &CreateRoom) -> AppResult<Room> {
        data.validate()?;
        let site = self.repository.locations.get_site(data.site_id).await?;
        if !site.is_active {
            return Err(AppError::BusinessRule(format!("Site {} is no longer active", site.id)));
        }
        let room = self.repository.locations.create_room(data).await?;
        tracing::info!("Created room {} '{}' in site {}", room.id, room.name, site.id);
        Ok(room)
    }

    pub async fn update_room(&self, id: i32, data: &UpdateRoom) -> AppResult<Room> {
        data.validate()?;
        let mut tx = self.repository.begin().await?;
        let room = self.repository.locations.update_room(&mut *tx, id, data).await?;
        let refreshed = match data.name {
            Some(_) => self.refresh_names(&mut *tx, LocationLevel::Room, id, &room.name).await?,
            None => 0,
        };
        tx.commit().await?;
        self.announce_refresh(LocationLevel::Room, refreshed);
        Ok(room)
    }

    // ---- Dependency checker ----

    /// Count what still points at a location; each count stops at the configured cap
    pub async fn check_dependencies(&self, level: LocationLevel, id: i32) -> AppResult<LocationDependencies> {
        // 404 for unknown ids rather than an empty report
        match level {
            LocationLevel::Company => self.repository.locations.get_company(id).await.map(|_| ())?,
            LocationLevel::Site => self.repository.locations.get_site(id).await.map(|_| ())?,
            LocationLevel::Room => self.repository.locations.get_room(id).await.map(|_| ())?,
        }
        let mut conn = self.repository.pool.acquire().await?;
        self.count_dependencies(&mut *conn, level, id).await
    }

    async fn count_dependencies(
        &self,
        conn: &mut PgConnection,
        level: LocationLevel,
        id: i32,
    ) -> AppResult<LocationDependencies> {
        let cap = self.dependency_cap;
        let equipment_count = self
            .repository
            .locations
            .count_equipment_at(&mut *conn, level, id, cap)
            .await?;
        let child_count = self
            .repository
            .locations
            .count_active_children(&mut *conn, level, id, cap)
            .await?;
        Ok(LocationDependencies::new(level, id, equipment_count, child_count, cap))
    }

    /// Soft delete, refused while equipment or active children remain.
    ///
    /// The location row stays locked from the counts to the update; writers
    /// that store a snapshot share-lock it, so nothing new can point here
    /// in between.
    pub async fn deactivate(&self, level: LocationLevel, id: i32) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        self.repository.locations.lock(&mut *tx, level, id).await?;

        let dependencies = self.count_dependencies(&mut *tx, level, id).await?;
        dependencies.ensure_deletable()?;

        if !self.repository.locations.set_inactive(&mut *tx, level, id).await? {
            return Err(AppError::NotFound(format!("{} {} not found", level.label(), id)));
        }
        tx.commit().await?;

        tracing::info!("Deactivated {} {}", level.label(), id);
        Ok(())
    }

    async fn refresh_names(
        &self,
        conn: &mut PgConnection,
        level: LocationLevel,
        id: i32,
        name: &str,
    ) -> AppResult<u64> {
        self.repository
            .locations
            .refresh_snapshot_names(conn, level, id, name)
            .await
    }

    fn announce_refresh(&self, level: LocationLevel, updated: u64) {
        if updated > 0 {
            tracing::info!(
                "Refreshed {} name in {} equipment snapshot(s)",
                level.label(),
                updated
            );
            self.feed.publish(InventoryEvent::LocationsChanged);
        }
    }
}
