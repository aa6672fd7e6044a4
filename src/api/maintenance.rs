//! Maintenance endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::maintenance::{
        CompleteMaintenance, CreateMaintenance, MaintenanceQuery, MaintenanceRecord, UpdateMaintenance,
    },
};

use super::AuthenticatedUser;

/// List maintenance records
#[utoipa::path(
    get,
    path = "/maintenance",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(MaintenanceQuery),
    responses(
        (status = 200, description = "Maintenance records", body = Vec<MaintenanceRecord>)
    )
)]
pub async fn list_maintenance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Query(query): Query<MaintenanceQuery>,
) -> AppResult<Json<Vec<MaintenanceRecord>>> {
    let records = state.services.maintenance.list(&query).await?;
    Ok(Json(records))
}

/// Get maintenance record by ID
#[utoipa::path(
    get,
    path = "/maintenance/{id}",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Maintenance record ID")),
    responses(
        (status = 200, description = "Maintenance record", body = MaintenanceRecord),
        (status = 404, description = "Record not found")
    )
)]
pub async fn get_maintenance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MaintenanceRecord>> {
    let record = state.services.maintenance.get_by_id(id).await?;
    Ok(Json(record))
}

/// Schedule a maintenance
#[utoipa::path(
    post,
    path = "/maintenance",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    request_body = CreateMaintenance,
    responses(
        (status = 201, description = "Maintenance scheduled", body = MaintenanceRecord),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn create_maintenance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Json(data): Json<CreateMaintenance>,
) -> AppResult<(StatusCode, Json<MaintenanceRecord>)> {
    let record = state.services.maintenance.create(&data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Update a maintenance record that is not closed yet
#[utoipa::path(
    put,
    path = "/maintenance/{id}",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Maintenance record ID")),
    request_body = UpdateMaintenance,
    responses(
        (status = 200, description = "Record updated", body = MaintenanceRecord),
        (status = 404, description = "Record not found"),
        (status = 409, description = "Record is completed or cancelled")
    )
)]
pub async fn update_maintenance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateMaintenance>,
) -> AppResult<Json<MaintenanceRecord>> {
    let record = state.services.maintenance.update(id, &data).await?;
    Ok(Json(record))
}

/// Start a scheduled maintenance
#[utoipa::path(
    post,
    path = "/maintenance/{id}/start",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Maintenance record ID")),
    responses(
        (status = 200, description = "Maintenance in progress", body = MaintenanceRecord),
        (status = 409, description = "Not scheduled")
    )
)]
pub async fn start_maintenance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MaintenanceRecord>> {
    let record = state.services.maintenance.start(id).await?;
    Ok(Json(record))
}

/// Complete a maintenance in progress
#[utoipa::path(
    post,
    path = "/maintenance/{id}/complete",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Maintenance record ID")),
    request_body = CompleteMaintenance,
    responses(
        (status = 200, description = "Maintenance completed", body = MaintenanceRecord),
        (status = 409, description = "Not in progress")
    )
)]
pub async fn complete_maintenance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<CompleteMaintenance>,
) -> AppResult<Json<MaintenanceRecord>> {
    let record = state.services.maintenance.complete(id, &data).await?;
    Ok(Json(record))
}

/// Cancel a maintenance that is scheduled or in progress
#[utoipa::path(
    post,
    path = "/maintenance/{id}/cancel",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Maintenance record ID")),
    responses(
        (status = 200, description = "Maintenance cancelled", body = MaintenanceRecord),
        (status = 409, description = "Already closed")
    )
)]
pub async fn cancel_maintenance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MaintenanceRecord>> {
    let record = state.services.maintenance.cancel(id).await?;
    Ok(Json(record))
}

/// Delete a maintenance record
#[utoipa::path(
    delete,
    path = "/maintenance/{id}",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Maintenance record ID")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn delete_maintenance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.maintenance.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
