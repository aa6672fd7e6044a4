//! Location endpoints: companies, sites and rooms

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::location::{
        Company, CreateCompany, CreateRoom, CreateSite, LocationDependencies, LocationLevel, LocationQuery,
        Room, Site, UpdateCompany, UpdateRoom, UpdateSite,
    },
};

use super::AuthenticatedUser;

// ---- Companies ----

/// List companies
#[utoipa::path(
    get,
    path = "/companies",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(LocationQuery),
    responses(
        (status = 200, description = "List of companies", body = Vec<Company>)
    )
)]
pub async fn list_companies(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Vec<Company>>> {
    let companies = state.services.locations.list_companies(&query).await?;
    Ok(Json(companies))
}

/// Get company by ID
#[utoipa::path(
    get,
    path = "/companies/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company details", body = Company),
        (status = 404, description = "Company not found")
    )
)]
pub async fn get_company(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Company>> {
    let company = state.services.locations.get_company(id).await?;
    Ok(Json(company))
}

/// Create a company
#[utoipa::path(
    post,
    path = "/companies",
    tag = "locations",
    security(("bearer_auth" = [])),
    request_body = CreateCompany,
    responses(
        (status = 201, description = "Company created", body = Company),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_company(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Json(data): Json<CreateCompany>,
) -> AppResult<(StatusCode, Json<Company>)> {
    let company = state.services.locations.create_company(&data).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

/// Update a company
#[utoipa::path(
    put,
    path = "/companies/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Company ID")),
    request_body = UpdateCompany,
    responses(
        (status = 200, description = "Company updated", body = Company),
        (status = 404, description = "Company not found")
    )
)]
pub async fn update_company(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateCompany>,
) -> AppResult<Json<Company>> {
    let company = state.services.locations.update_company(id, &data).await?;
    Ok(Json(company))
}

/// Count what still depends on a company
#[utoipa::path(
    get,
    path = "/companies/{id}/dependencies",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Dependency counts", body = LocationDependencies),
        (status = 404, description = "Company not found")
    )
)]
pub async fn company_dependencies(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LocationDependencies>> {
    let deps = state
        .services
        .locations
        .check_dependencies(LocationLevel::Company, id)
        .await?;
    Ok(Json(deps))
}

/// Soft delete a company
#[utoipa::path(
    delete,
    path = "/companies/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Company ID")),
    responses(
        (status = 204, description = "Company deactivated"),
        (status = 404, description = "Company not found"),
        (status = 409, description = "Sites or equipment still attached")
    )
)]
pub async fn delete_company(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.locations.deactivate(LocationLevel::Company, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Sites ----

/// List sites, optionally for one company
#[utoipa::path(
    get,
    path = "/sites",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(LocationQuery),
    responses(
        (status = 200, description = "List of sites", body = Vec<Site>)
    )
)]
pub async fn list_sites(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Vec<Site>>> {
    let sites = state.services.locations.list_sites(&query).await?;
    Ok(Json(sites))
}

/// Get site by ID
#[utoipa::path(
    get,
    path = "/sites/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Site details", body = Site),
        (status = 404, description = "Site not found")
    )
)]
pub async fn get_site(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Site>> {
    let site = state.services.locations.get_site(id).await?;
    Ok(Json(site))
}

/// Create a site under an active company
#[utoipa::path(
    post,
    path = "/sites",
    tag = "locations",
    security(("bearer_auth" = [])),
    request_body = CreateSite,
    responses(
        (status = 201, description = "Site created", body = Site),
        (status = 400, description = "Invalid input"),
        (status = 422, description = "Company is inactive")
    )
)]
pub async fn create_site(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Json(data): Json<CreateSite>,
) -> AppResult<(StatusCode, Json<Site>)> {
    let site = state.services.locations.create_site(&data).await?;
    Ok((StatusCode::CREATED, Json(site)))
}

/// Update a site
#[utoipa::path(
    put,
    path = "/sites/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Site ID")),
    request_body = UpdateSite,
    responses(
        (status = 200, description = "Site updated", body = Site),
        (status = 404, description = "Site not found")
    )
)]
pub async fn update_site(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateSite>,
) -> AppResult<Json<Site>> {
    let site = state.services.locations.update_site(id, &data).await?;
    Ok(Json(site))
}

/// Count what still depends on a site
#[utoipa::path(
    get,
    path = "/sites/{id}/dependencies",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Dependency counts", body = LocationDependencies),
        (status = 404, description = "Site not found")
    )
)]
pub async fn site_dependencies(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LocationDependencies>> {
    let deps = state
        .services
        .locations
        .check_dependencies(LocationLevel::Site, id)
        .await?;
    Ok(Json(deps))
}

/// Soft delete a site
#[utoipa::path(
    delete,
    path = "/sites/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Site ID")),
    responses(
        (status = 204, description = "Site deactivated"),
        (status = 404, description = "Site not found"),
        (status = 409, description = "Rooms or equipment still attached")
    )
)]
pub async fn delete_site(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.locations.deactivate(LocationLevel::Site, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Rooms ----

/// List rooms, optionally for one site
#[utoipa::path(
    get,
    path = "/rooms",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(LocationQuery),
    responses(
        (status = 200, description = "List of rooms", body = Vec<Room>)
    )
)]
pub async fn list_rooms(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Vec<Room>>> {
    let rooms = state.services.locations.list_rooms(&query).await?;
    Ok(Json(rooms))
}

/// Get room by ID
#[utoipa::path(
    get,
    path = "/rooms/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Room details", body = Room),
        (status = 404, description = "Room not found")
    )
)]
pub async fn get_room(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Room>> {
    let room = state.services.locations.get_room(id).await?;
    Ok(Json(room))
}

/// Create a room under an active site
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "locations",
    security(("bearer_auth" = [])),
    request_body = CreateRoom,
    responses(
        (status = 201, description = "Room created", body = Room),
        (status = 400, description = "Invalid input"),
        (status = 422, description = "Site is inactive")
    )
)]
pub async fn create_room(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Json(data): Json<CreateRoom>,
) -> AppResult<(StatusCode, Json<Room>)> {
    let room = state.services.locations.create_room(&data).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// Update a room
#[utoipa::path(
    put,
    path = "/rooms/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Room ID")),
    request_body = UpdateRoom,
    responses(
        (status = 200, description = "Room updated", body = Room),
        (status = 404, description = "Room not found")
    )
)]
pub async fn update_room(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateRoom>,
) -> AppResult<Json<Room>> {
    let room = state.services.locations.update_room(id, &data).await?;
    Ok(Json(room))
}

/// Count equipment still located in a room
#[utoipa::path(
    get,
    path = "/rooms/{id}/dependencies",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Dependency counts", body = LocationDependencies),
        (status = 404, description = "Room not found")
    )
)]
pub async fn room_dependencies(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LocationDependencies>> {
    let deps = state
        .services
        .locations
        .check_dependencies(LocationLevel::Room, id)
        .await?;
    Ok(Json(deps))
}

/// Soft delete a room
#[utoipa::path(
    delete,
    path = "/rooms/{id}",
    tag = "locations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Room ID")),
    responses(
        (status = 204, description = "Room deactivated"),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Equipment still located there")
    )
)]
pub async fn delete_room(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.locations.deactivate(LocationLevel::Room, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
