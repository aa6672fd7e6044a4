//! Equipment service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{ArchiveEquipment, CreateEquipment, Equipment, EquipmentFilters, UpdateEquipment},
        session::Session,
    },
    repository::Repository,
};

use super::{
    events::{ChangeFeed, InventoryEvent},
    export,
    locations::LocationsService,
    settings::SettingsService,
    storage::BlobStore,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
    locations: LocationsService,
    settings: SettingsService,
    storage: Arc<dyn BlobStore>,
    feed: ChangeFeed,
    default_limit: Option<i64>,
}

impl EquipmentService {
    pub fn new(
        repository: Repository,
        locations: LocationsService,
        settings: SettingsService,
        storage: Arc<dyn BlobStore>,
        feed: ChangeFeed,
        default_limit: Option<i64>,
    ) -> Self {
        Self {
            repository,
            locations,
            settings,
            storage,
            feed,
            default_limit,
        }
    }

    /// Run the filter pipeline: database predicates first, then in-process filters.
    ///
    /// The row cap applies to the database phase, so in-process filters may
    /// return fewer rows than the cap even when more would match.
    pub async fn list(&self, filters: &EquipmentFilters) -> AppResult<Vec<Equipment>> {
        let limit = filters.limit.or(self.default_limit).filter(|l| *l > 0);
        let rows = self.repository.equipment.list(filters, limit).await?;
        if !filters.has_post_filters() {
            return Ok(rows);
        }
        let settings = self.settings.get_settings().await?;
        Ok(filters.apply(rows, &settings.data))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        self.repository.equipment.get_by_id(id).await
    }

    /// Create equipment; the reference is allocated first and is lost if the insert fails
    pub async fn create(&self, data: &CreateEquipment, session: &Session) -> AppResult<Equipment> {
        data.validate()?;
        // Fail early on a bad location before a reference is spent
        if let Some(location) = data.location {
            self.locations.resolve(location).await?;
        }

        let reference = self.settings.next_reference().await?;
        let mut tx = self.repository.begin().await?;
        let location = match data.location {
            Some(location) => Some(self.locations.resolve_locked(&mut *tx, location).await?),
            None => None,
        };
        let equipment = self
            .repository
            .equipment
            .create(&mut *tx, data, &reference, location.as_ref(), session.user_id())
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Created equipment {} '{}' ({}) by {}",
            equipment.id,
            equipment.name,
            equipment.reference,
            session.user_id()
        );
        self.feed.publish(InventoryEvent::EquipmentChanged { equipment_id: equipment.id });
        self.notify_low_stock(&equipment).await?;
        Ok(equipment)
    }

    pub async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        data.validate()?;
        let current = self.repository.equipment.get_by_id(id).await?;
        data.validate_against(&current)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let mut tx = self.repository.begin().await?;
        // Equipment row before location rows, as in the movement workflow
        self.repository.equipment.lock(&mut *tx, id).await?;
        let location = match data.location {
            Some(location) => Some(self.locations.resolve_locked(&mut *tx, location).await?),
            None => None,
        };
        let equipment = self
            .repository
            .equipment
            .update(&mut *tx, id, data, location.as_ref())
            .await?;
        tx.commit().await?;
        self.feed.publish(InventoryEvent::EquipmentChanged { equipment_id: id });

        if data.quantity.is_some() || data.min_quantity.is_some() {
            self.notify_low_stock(&equipment).await?;
        }
        Ok(equipment)
    }

    /// Soft delete with a mandatory reason
    pub async fn archive(&self, id: i32, data: &ArchiveEquipment) -> AppResult<Equipment> {
        data.validate()?;
        let reason = data.reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("An archive reason is required".to_string()));
        }
        let equipment = self.repository.equipment.archive(id, reason).await?;
        tracing::info!("Archived equipment {}: {}", id, reason);
        self.feed.publish(InventoryEvent::EquipmentChanged { equipment_id: id });
        Ok(equipment)
    }

    pub async fn restore(&self, id: i32) -> AppResult<Equipment> {
        let equipment = self.repository.equipment.restore(id).await?;
        tracing::info!("Restored equipment {}", id);
        self.feed.publish(InventoryEvent::EquipmentChanged { equipment_id: id });
        Ok(equipment)
    }

    /// Hard delete. Movements and maintenance go with the row; blobs are removed best effort.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let equipment = self.repository.equipment.delete(id).await?;

        let mut paths: Vec<String> = equipment
            .documents
            .iter()
            .map(|d| d.storage_path.clone())
            .collect();
        paths.extend(equipment.photos.iter().filter_map(|url| self.storage.path_from_url(url)));

        for path in paths {
            if let Err(e) = self.storage.delete(&path).await {
                tracing::warn!("Could not remove blob {} of deleted equipment {}: {}", path, id, e);
            }
        }

        tracing::info!("Deleted equipment {} ({})", id, equipment.reference);
        self.feed.publish(InventoryEvent::EquipmentChanged { equipment_id: id });
        Ok(())
    }

    /// Export the filtered list as CSV
    pub async fn export_csv(&self, filters: &EquipmentFilters) -> AppResult<Vec<u8>> {
        let rows = self.list(filters).await?;
        let settings = self.settings.get_settings().await?;
        export::equipment_csv(&rows, &settings.data)
    }

    async fn notify_low_stock(&self, equipment: &Equipment) -> AppResult<()> {
        if !equipment.is_consumable {
            return Ok(());
        }
        let settings = self.settings.get_settings().await?;
        if !settings.data.notify_low_stock || !equipment.is_low_stock(settings.data.low_stock_threshold) {
            return Ok(());
        }
        let quantity = equipment.quantity.unwrap_or(0);
        let min_quantity = equipment
            .min_quantity
            .unwrap_or(settings.data.low_stock_threshold);
        tracing::info!(
            "Low stock on {} '{}': {} left (minimum {})",
            equipment.reference,
            equipment.name,
            quantity,
            min_quantity
        );
        self.feed.publish(InventoryEvent::LowStock {
            equipment_id: equipment.id,
            reference: equipment.reference.clone(),
            name: equipment.name.clone(),
            quantity,
            min_quantity,
        });
        Ok(())
    }
}
