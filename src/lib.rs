//! Radiodesk Inventory Server
//!
//! Equipment inventory for a radio station back office: locations,
//! equipment with generated references, a movement workflow with approval,
//! maintenance, documents and photos, CSV export and realtime updates,
//! served as a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
