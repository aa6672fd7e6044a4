//! Document and photo endpoints (multipart uploads)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::document::{DocumentMetadata, EquipmentDocument},
    services::documents::Upload,
};

use super::AuthenticatedUser;

/// Multipart form of a document upload
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct DocumentUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub name: Option<String>,
    pub document_type_id: Option<String>,
    /// public, company, team, admin or restricted
    pub access_level: Option<String>,
    /// Comma separated user ids for restricted documents
    pub allowed_user_ids: Option<String>,
}

/// Multipart form of a photo upload
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct PhotoUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PhotoRef {
    pub url: String,
}

/// Read the `file` part and the text fields of a form
async fn read_form(mut multipart: Multipart) -> AppResult<(Upload, Vec<(String, String)>)> {
    let mut upload = None;
    let mut fields = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if name == "file" {
            let file_name = field.file_name().unwrap_or("file").to_string();
            let content_type = field.content_type().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            upload = Some(Upload {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            if !text.trim().is_empty() {
                fields.push((name, text));
            }
        }
    }

    let upload = upload.ok_or_else(|| AppError::Validation("Missing 'file' part".to_string()))?;
    Ok((upload, fields))
}

fn document_metadata(fields: Vec<(String, String)>) -> AppResult<DocumentMetadata> {
    let mut metadata = DocumentMetadata::default();
    for (name, value) in fields {
        match name.as_str() {
            "name" => metadata.name = Some(value),
            "document_type_id" => metadata.document_type_id = Some(value),
            "access_level" => {
                metadata.access_level = Some(value.trim().parse().map_err(AppError::Validation)?);
            }
            "allowed_user_ids" => metadata.allowed_user_ids.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from),
            ),
            _ => (),
        }
    }
    Ok(metadata)
}

/// Documents of an equipment visible to the caller
#[utoipa::path(
    get,
    path = "/equipment/{id}/documents",
    tag = "documents",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Visible documents", body = Vec<EquipmentDocument>),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn list_documents(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<EquipmentDocument>>> {
    let documents = state.services.documents.list_documents(id, &session).await?;
    Ok(Json(documents))
}

/// Upload a document
#[utoipa::path(
    post,
    path = "/equipment/{id}/documents",
    tag = "documents",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body(content = DocumentUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Document stored", body = EquipmentDocument),
        (status = 400, description = "Missing, empty or oversized file"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn upload_document(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<EquipmentDocument>)> {
    let (upload, fields) = read_form(multipart).await?;
    let metadata = document_metadata(fields)?;
    let document = state
        .services
        .documents
        .upload_document(id, upload, metadata, &session)
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Delete a document and its file
#[utoipa::path(
    delete,
    path = "/equipment/{id}/documents/{document_id}",
    tag = "documents",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Equipment ID"),
        ("document_id" = String, Path, description = "Document ID")
    ),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "Equipment or document not found")
    )
)]
pub async fn delete_document(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path((id, document_id)): Path<(i32, String)>,
) -> AppResult<StatusCode> {
    state.services.documents.delete_document(id, &document_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a photo
#[utoipa::path(
    post,
    path = "/equipment/{id}/photos",
    tag = "documents",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body(content = PhotoUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Photo stored", body = PhotoRef),
        (status = 400, description = "Missing, empty, oversized or non-image file"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn add_photo(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<PhotoRef>)> {
    let (upload, _) = read_form(multipart).await?;
    let url = state.services.documents.add_photo(id, upload).await?;
    Ok((StatusCode::CREATED, Json(PhotoRef { url })))
}

/// Remove a photo by URL
#[utoipa::path(
    delete,
    path = "/equipment/{id}/photos",
    tag = "documents",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body = PhotoRef,
    responses(
        (status = 204, description = "Photo removed"),
        (status = 404, description = "Equipment or photo not found")
    )
)]
pub async fn remove_photo(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(photo): Json<PhotoRef>,
) -> AppResult<StatusCode> {
    state.services.documents.remove_photo(id, &photo.url).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::AccessLevel;

    fn field(name: &str, value: &str) -> (String, String) {
        (name.to_string(), value.to_string())
    }

    #[test]
    fn test_metadata_from_form_fields() {
        let metadata = document_metadata(vec![
            field("name", "Manuel"),
            field("access_level", "restricted"),
            field("allowed_user_ids", "u-1, u-2,,"),
            field("unknown", "ignored"),
        ])
        .unwrap();
        assert_eq!(metadata.name.as_deref(), Some("Manuel"));
        assert_eq!(metadata.access_level, Some(AccessLevel::Restricted));
        assert_eq!(metadata.allowed_user_ids, vec!["u-1", "u-2"]);
    }

    #[test]
    fn test_unknown_access_level_rejected() {
        let err = document_metadata(vec![field("access_level", "everyone")]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
