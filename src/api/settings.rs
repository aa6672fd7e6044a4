//! Settings endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::settings::{ConfigurableOption, InventorySettings, OptionInput, OptionList, UpdateOption, UpdateSettings},
};

use super::AuthenticatedUser;

/// Reference the next created equipment would receive
#[derive(Serialize, ToSchema)]
pub struct ReferencePreview {
    pub reference: String,
}

/// Get current settings
#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current settings", body = InventorySettings)
    )
)]
pub async fn get_settings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
) -> AppResult<Json<InventorySettings>> {
    let settings = state.services.settings.get_settings().await?;
    Ok(Json(settings))
}

/// Update settings
#[utoipa::path(
    put,
    path = "/settings",
    tag = "settings",
    security(("bearer_auth" = [])),
    request_body = UpdateSettings,
    responses(
        (status = 200, description = "Settings updated", body = InventorySettings),
        (status = 400, description = "Invalid prefix, counter or threshold")
    )
)]
pub async fn update_settings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(request): Json<UpdateSettings>,
) -> AppResult<Json<InventorySettings>> {
    let settings = state.services.settings.update_settings(request, &session).await?;
    Ok(Json(settings))
}

/// Preview the next equipment reference without consuming it
#[utoipa::path(
    get,
    path = "/settings/reference/next",
    tag = "settings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Next reference", body = ReferencePreview)
    )
)]
pub async fn preview_reference(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
) -> AppResult<Json<ReferencePreview>> {
    let settings = state.services.settings.get_settings().await?;
    Ok(Json(ReferencePreview {
        reference: settings.next_reference_preview()?,
    }))
}

/// Options of one list, including inactive ones
#[utoipa::path(
    get,
    path = "/settings/options/{list}",
    tag = "settings",
    security(("bearer_auth" = [])),
    params(("list" = OptionList, Path, description = "Option list")),
    responses(
        (status = 200, description = "Options", body = Vec<ConfigurableOption>)
    )
)]
pub async fn list_options(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(list): Path<OptionList>,
) -> AppResult<Json<Vec<ConfigurableOption>>> {
    let settings = state.services.settings.get_settings().await?;
    Ok(Json(settings.data.options(list).clone()))
}

/// Replace a whole option list
#[utoipa::path(
    put,
    path = "/settings/options/{list}",
    tag = "settings",
    security(("bearer_auth" = [])),
    params(("list" = OptionList, Path, description = "Option list")),
    request_body = Vec<OptionInput>,
    responses(
        (status = 200, description = "List replaced", body = Vec<ConfigurableOption>),
        (status = 400, description = "Invalid option")
    )
)]
pub async fn replace_options(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(list): Path<OptionList>,
    Json(options): Json<Vec<OptionInput>>,
) -> AppResult<Json<Vec<ConfigurableOption>>> {
    let options = state
        .services
        .settings
        .replace_options(list, options, &session)
        .await?;
    Ok(Json(options))
}

/// Add one option to a list
#[utoipa::path(
    post,
    path = "/settings/options/{list}",
    tag = "settings",
    security(("bearer_auth" = [])),
    params(("list" = OptionList, Path, description = "Option list")),
    request_body = OptionInput,
    responses(
        (status = 201, description = "Option added", body = ConfigurableOption),
        (status = 400, description = "Invalid option")
    )
)]
pub async fn add_option(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(list): Path<OptionList>,
    Json(option): Json<OptionInput>,
) -> AppResult<(StatusCode, Json<ConfigurableOption>)> {
    let option = state.services.settings.add_option(list, option, &session).await?;
    Ok((StatusCode::CREATED, Json(option)))
}

/// Update one option
#[utoipa::path(
    put,
    path = "/settings/options/{list}/{option_id}",
    tag = "settings",
    security(("bearer_auth" = [])),
    params(
        ("list" = OptionList, Path, description = "Option list"),
        ("option_id" = String, Path, description = "Option ID")
    ),
    request_body = UpdateOption,
    responses(
        (status = 200, description = "Option updated", body = ConfigurableOption),
        (status = 404, description = "Option not found")
    )
)]
pub async fn update_option(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path((list, option_id)): Path<(OptionList, String)>,
    Json(patch): Json<UpdateOption>,
) -> AppResult<Json<ConfigurableOption>> {
    let option = state
        .services
        .settings
        .update_option(list, &option_id, patch, &session)
        .await?;
    Ok(Json(option))
}

/// Deactivate one option; records keep pointing at it
#[utoipa::path(
    delete,
    path = "/settings/options/{list}/{option_id}",
    tag = "settings",
    security(("bearer_auth" = [])),
    params(
        ("list" = OptionList, Path, description = "Option list"),
        ("option_id" = String, Path, description = "Option ID")
    ),
    responses(
        (status = 200, description = "Option deactivated", body = ConfigurableOption),
        (status = 404, description = "Option not found")
    )
)]
pub async fn deactivate_option(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path((list, option_id)): Path<(OptionList, String)>,
) -> AppResult<Json<ConfigurableOption>> {
    let option = state
        .services
        .settings
        .deactivate_option(list, &option_id, &session)
        .await?;
    Ok(Json(option))
}
