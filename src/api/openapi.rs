//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{documents, equipment, health, locations, maintenance, movements, settings, subscriptions};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Radiodesk API",
        version = "1.0.0",
        description = "Radio station equipment inventory REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&BearerAuth),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Locations
        locations::list_companies,
        locations::get_company,
        locations::create_company,
        locations::update_company,
        locations::company_dependencies,
        locations::delete_company,
        locations::list_sites,
        locations::get_site,
        locations::create_site,
        locations::update_site,
        locations::site_dependencies,
        locations::delete_site,
        locations::list_rooms,
        locations::get_room,
        locations::create_room,
        locations::update_room,
        locations::room_dependencies,
        locations::delete_room,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::archive_equipment,
        equipment::restore_equipment,
        equipment::delete_equipment,
        equipment::equipment_movements,
        equipment::export_equipment,
        // Documents and photos
        documents::list_documents,
        documents::upload_document,
        documents::delete_document,
        documents::add_photo,
        documents::remove_photo,
        // Movements
        movements::list_movements,
        movements::get_movement,
        movements::create_movement,
        movements::approve_movement,
        movements::reject_movement,
        // Maintenance
        maintenance::list_maintenance,
        maintenance::get_maintenance,
        maintenance::create_maintenance,
        maintenance::update_maintenance,
        maintenance::start_maintenance,
        maintenance::complete_maintenance,
        maintenance::cancel_maintenance,
        maintenance::delete_maintenance,
        // Settings
        settings::get_settings,
        settings::update_settings,
        settings::preview_reference,
        settings::list_options,
        settings::replace_options,
        settings::add_option,
        settings::update_option,
        settings::deactivate_option,
        // Subscriptions
        subscriptions::subscribe_equipment,
        subscriptions::subscribe_settings,
        subscriptions::subscribe_notifications,
    ),
    components(
        schemas(
            // Locations
            crate::models::location::Company,
            crate::models::location::CompanyType,
            crate::models::location::CreateCompany,
            crate::models::location::UpdateCompany,
            crate::models::location::Site,
            crate::models::location::CreateSite,
            crate::models::location::UpdateSite,
            crate::models::location::Room,
            crate::models::location::CreateRoom,
            crate::models::location::UpdateRoom,
            crate::models::location::LocationSnapshot,
            crate::models::location::LocationRef,
            crate::models::location::LocationLevel,
            crate::models::location::LocationDependencies,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::Assignment,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::models::equipment::ArchiveEquipment,
            // Documents
            crate::models::document::EquipmentDocument,
            crate::models::document::AccessLevel,
            documents::DocumentUploadForm,
            documents::PhotoUploadForm,
            documents::PhotoRef,
            // Movements
            crate::models::movement::EquipmentMovement,
            crate::models::movement::MovementEndpoint,
            crate::models::movement::Assignee,
            crate::models::movement::MovementCategory,
            crate::models::movement::MovementStatus,
            crate::models::movement::CreateMovement,
            crate::models::movement::RejectMovement,
            crate::services::movements::MovementOutcome,
            movements::MovementPage,
            // Maintenance
            crate::models::maintenance::MaintenanceRecord,
            crate::models::maintenance::MaintenanceType,
            crate::models::maintenance::MaintenanceStatus,
            crate::models::maintenance::CreateMaintenance,
            crate::models::maintenance::UpdateMaintenance,
            crate::models::maintenance::CompleteMaintenance,
            // Settings
            crate::models::settings::InventorySettings,
            crate::models::settings::SettingsData,
            crate::models::settings::ConfigurableOption,
            crate::models::settings::OptionList,
            crate::models::settings::OptionInput,
            crate::models::settings::UpdateOption,
            crate::models::settings::UpdateSettings,
            settings::ReferencePreview,
            // Realtime
            crate::services::events::InventoryEvent,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "locations", description = "Companies, sites and rooms"),
        (name = "equipment", description = "Equipment inventory"),
        (name = "documents", description = "Documents and photos"),
        (name = "movements", description = "Movement workflow"),
        (name = "maintenance", description = "Maintenance records"),
        (name = "settings", description = "Inventory settings and option lists"),
        (name = "subscriptions", description = "Realtime Server-Sent Events streams")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
