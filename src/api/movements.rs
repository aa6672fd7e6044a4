//! Movement endpoints: requests, approval and history

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::movement::{CreateMovement, EquipmentMovement, MovementQuery, RejectMovement},
    services::movements::MovementOutcome,
};

use super::AuthenticatedUser;

/// Page of movements
#[derive(Serialize, ToSchema)]
pub struct MovementPage {
    pub items: Vec<EquipmentMovement>,
    /// Total number of matching movements
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// List movements, newest first
#[utoipa::path(
    get,
    path = "/movements",
    tag = "movements",
    security(("bearer_auth" = [])),
    params(MovementQuery),
    responses(
        (status = 200, description = "Page of movements", body = MovementPage)
    )
)]
pub async fn list_movements(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Query(query): Query<MovementQuery>,
) -> AppResult<Json<MovementPage>> {
    let (items, total) = state.services.movements.list(&query).await?;
    Ok(Json(MovementPage {
        items,
        total,
        page: query.page.unwrap_or(1).max(1),
        per_page: query.per_page.unwrap_or(50).clamp(1, 200),
    }))
}

/// Get movement by ID
#[utoipa::path(
    get,
    path = "/movements/{id}",
    tag = "movements",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Movement ID")),
    responses(
        (status = 200, description = "Movement details", body = EquipmentMovement),
        (status = 404, description = "Movement not found")
    )
)]
pub async fn get_movement(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<EquipmentMovement>> {
    let movement = state.services.movements.get_by_id(id).await?;
    Ok(Json(movement))
}

/// Request a movement
///
/// Completes immediately unless the movement type or a cross-company
/// transfer needs approval, in which case it is recorded as pending.
#[utoipa::path(
    post,
    path = "/movements",
    tag = "movements",
    security(("bearer_auth" = [])),
    request_body = CreateMovement,
    responses(
        (status = 201, description = "Movement recorded", body = MovementOutcome),
        (status = 400, description = "Invalid input or nothing would change"),
        (status = 404, description = "Equipment or location not found"),
        (status = 422, description = "Movement not allowed")
    )
)]
pub async fn create_movement(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(data): Json<CreateMovement>,
) -> AppResult<(StatusCode, Json<MovementOutcome>)> {
    let outcome = state.services.movements.create(&data, &session).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Approve a pending movement and apply it to the equipment
#[utoipa::path(
    post,
    path = "/movements/{id}/approve",
    tag = "movements",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Movement ID")),
    responses(
        (status = 200, description = "Movement completed", body = MovementOutcome),
        (status = 404, description = "Movement not found"),
        (status = 409, description = "Movement is no longer pending")
    )
)]
pub async fn approve_movement(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MovementOutcome>> {
    let outcome = state.services.movements.approve(id, &session).await?;
    Ok(Json(outcome))
}

/// Reject a pending movement
#[utoipa::path(
    post,
    path = "/movements/{id}/reject",
    tag = "movements",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Movement ID")),
    request_body = RejectMovement,
    responses(
        (status = 200, description = "Movement rejected", body = EquipmentMovement),
        (status = 400, description = "Missing reason"),
        (status = 409, description = "Movement is no longer pending")
    )
)]
pub async fn reject_movement(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<RejectMovement>,
) -> AppResult<Json<EquipmentMovement>> {
    let movement = state.services.movements.reject(id, &data, &session).await?;
    Ok(Json(movement))
}
