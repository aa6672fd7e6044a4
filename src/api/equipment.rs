//! Equipment endpoints

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::Query;

use crate::{
    error::AppResult,
    models::{
        equipment::{ArchiveEquipment, CreateEquipment, Equipment, EquipmentFilters, UpdateEquipment},
        movement::EquipmentMovement,
    },
};

use super::AuthenticatedUser;

/// List equipment through the filter pipeline
///
/// Multi-valued filters repeat the key: `?category_id=cat-1&category_id=cat-2`.
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(EquipmentFilters),
    responses(
        (status = 200, description = "Matching equipment ordered by name", body = Vec<Equipment>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Query(filters): Query<EquipmentFilters>,
) -> AppResult<Json<Vec<Equipment>>> {
    let equipment = state.services.equipment.list(&filters).await?;
    Ok(Json(equipment))
}

/// Get equipment by ID
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment details", body = Equipment),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn get_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Equipment>> {
    let equipment = state.services.equipment.get_by_id(id).await?;
    Ok(Json(equipment))
}

/// Create equipment; the reference is allocated by the server
#[utoipa::path(
    post,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Equipment created", body = Equipment),
        (status = 400, description = "Invalid input"),
        (status = 503, description = "Reference counter busy, retry later")
    )
)]
pub async fn create_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(data): Json<CreateEquipment>,
) -> AppResult<(StatusCode, Json<Equipment>)> {
    let equipment = state.services.equipment.create(&data, &session).await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

/// Update equipment
#[utoipa::path(
    put,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body = UpdateEquipment,
    responses(
        (status = 200, description = "Equipment updated", body = Equipment),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn update_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateEquipment>,
) -> AppResult<Json<Equipment>> {
    let equipment = state.services.equipment.update(id, &data).await?;
    Ok(Json(equipment))
}

/// Archive equipment with a reason
#[utoipa::path(
    post,
    path = "/equipment/{id}/archive",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body = ArchiveEquipment,
    responses(
        (status = 200, description = "Equipment archived", body = Equipment),
        (status = 400, description = "Missing reason"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn archive_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<ArchiveEquipment>,
) -> AppResult<Json<Equipment>> {
    let equipment = state.services.equipment.archive(id, &data).await?;
    Ok(Json(equipment))
}

/// Bring archived equipment back
#[utoipa::path(
    post,
    path = "/equipment/{id}/restore",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment restored", body = Equipment),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn restore_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Equipment>> {
    let equipment = state.services.equipment.restore(id).await?;
    Ok(Json(equipment))
}

/// Permanently delete equipment with its history and files
#[utoipa::path(
    delete,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 204, description = "Equipment deleted"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn delete_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.equipment.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Movement history of one equipment, newest first
#[utoipa::path(
    get,
    path = "/equipment/{id}/movements",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Movement history", body = Vec<EquipmentMovement>),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn equipment_movements(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<EquipmentMovement>>> {
    let movements = state.services.movements.list_for_equipment(id).await?;
    Ok(Json(movements))
}

/// Export the filtered list as a semicolon separated CSV file
#[utoipa::path(
    get,
    path = "/equipment/export.csv",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(EquipmentFilters),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv")
    )
)]
pub async fn export_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Query(filters): Query<EquipmentFilters>,
) -> AppResult<impl IntoResponse> {
    let body = state.services.equipment.export_csv(&filters).await?;
    let disposition = format!(
        "attachment; filename=\"inventaire-{}.csv\"",
        chrono::Utc::now().format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
