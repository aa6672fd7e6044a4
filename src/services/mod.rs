//! Business logic services

pub mod documents;
pub mod equipment;
pub mod events;
pub mod export;
pub mod locations;
pub mod maintenance;
pub mod movements;
pub mod settings;
pub mod storage;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub locations: locations::LocationsService,
    pub equipment: equipment::EquipmentService,
    pub movements: movements::MovementsService,
    pub maintenance: maintenance::MaintenanceService,
    pub documents: documents::DocumentsService,
    pub settings: settings::SettingsService,
    pub feed: events::ChangeFeed,
}

impl Services {
    /// Create all services with the given repository and blob store
    pub fn new(repository: Repository, config: &AppConfig, storage: Arc<dyn storage::BlobStore>) -> Self {
        let feed = events::ChangeFeed::new(config.inventory.change_feed_capacity);
        let settings = settings::SettingsService::new(repository.clone(), feed.clone(), &config.inventory);
        let locations = locations::LocationsService::new(repository.clone(), feed.clone(), &config.inventory);

        Self {
            equipment: equipment::EquipmentService::new(
                repository.clone(),
                locations.clone(),
                settings.clone(),
                storage.clone(),
                feed.clone(),
                config.inventory.default_list_limit,
            ),
            movements: movements::MovementsService::new(
                repository.clone(),
                locations.clone(),
                settings.clone(),
                feed.clone(),
            ),
            maintenance: maintenance::MaintenanceService::new(repository.clone()),
            documents: documents::DocumentsService::new(repository, storage, feed.clone(), &config.storage),
            locations,
            settings,
            feed,
        }
    }
}
