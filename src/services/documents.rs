//! Documents and photos: blobs in storage, metadata embedded in the equipment row

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::StorageConfig,
    error::{AppError, AppResult},
    models::{
        document::{storage_path, AttachmentKind, DocumentMetadata, EquipmentDocument},
        session::Session,
    },
    repository::Repository,
};

use super::{
    events::{ChangeFeed, InventoryEvent},
    storage::BlobStore,
};

/// File received from a client
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct DocumentsService {
    repository: Repository,
    storage: Arc<dyn BlobStore>,
    feed: ChangeFeed,
    max_upload_bytes: usize,
}

impl DocumentsService {
    pub fn new(repository: Repository, storage: Arc<dyn BlobStore>, feed: ChangeFeed, config: &StorageConfig) -> Self {
        Self {
            repository,
            storage,
            feed,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    fn check_upload(&self, upload: &Upload) -> AppResult<()> {
        if upload.bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if upload.bytes.len() > self.max_upload_bytes {
            return Err(AppError::Validation(format!(
                "File exceeds the {} byte upload limit",
                self.max_upload_bytes
            )));
        }
        Ok(())
    }

    /// Documents of an equipment the session is allowed to see
    pub async fn list_documents(&self, equipment_id: i32, session: &Session) -> AppResult<Vec<EquipmentDocument>> {
        let equipment = self.repository.equipment.get_by_id(equipment_id).await?;
        let company = equipment.company_id();
        Ok(equipment
            .documents
            .into_iter()
            .filter(|d| d.is_visible_to(session, company))
            .collect())
    }

    /// Store the blob, then append its metadata under the equipment row lock
    pub async fn upload_document(
        &self,
        equipment_id: i32,
        upload: Upload,
        metadata: DocumentMetadata,
        session: &Session,
    ) -> AppResult<EquipmentDocument> {
        self.check_upload(&upload)?;
        // Fail before writing the blob when the equipment does not exist
        self.repository.equipment.get_by_id(equipment_id).await?;

        let now = Utc::now();
        let path = storage_path(
            equipment_id,
            AttachmentKind::Document,
            now.timestamp_millis(),
            &upload.file_name,
        );
        let blob = self.storage.put(&path, &upload.bytes).await?;

        let document = EquipmentDocument {
            id: Uuid::new_v4().to_string(),
            equipment_id,
            name: metadata
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| upload.file_name.clone()),
            document_type_id: metadata.document_type_id,
            storage_path: blob.path,
            url: blob.url,
            content_type: upload.content_type,
            size_bytes: blob.size_bytes,
            sha256: blob.sha256,
            access_level: metadata.access_level.unwrap_or_default(),
            allowed_user_ids: metadata.allowed_user_ids,
            uploaded_by: session.user_id().to_string(),
            uploaded_at: now,
        };

        let appended = async {
            let mut tx = self.repository.begin().await?;
            let equipment = self.repository.equipment.lock(&mut *tx, equipment_id).await?;
            let mut documents = equipment.documents;
            documents.push(document.clone());
            self.repository
                .equipment
                .set_documents(&mut *tx, equipment_id, &documents)
                .await?;
            tx.commit().await?;
            Ok::<_, AppError>(())
        }
        .await;

        if let Err(e) = appended {
            self.discard_blob(&document.storage_path).await;
            return Err(e);
        }

        tracing::info!(
            "Uploaded document '{}' ({} bytes) to equipment {}",
            document.name,
            document.size_bytes,
            equipment_id
        );
        self.feed.publish(InventoryEvent::EquipmentChanged { equipment_id });
        Ok(document)
    }

    /// Remove the blob, then drop the metadata entry
    pub async fn delete_document(&self, equipment_id: i32, document_id: &str) -> AppResult<()> {
        let equipment = self.repository.equipment.get_by_id(equipment_id).await?;
        let document = equipment
            .documents
            .iter()
            .find(|d| d.id == document_id)
            .ok_or_else(|| AppError::NotFound(format!("Document {} not found", document_id)))?;
        self.storage.delete(&document.storage_path).await?;

        let mut tx = self.repository.begin().await?;
        let equipment = self.repository.equipment.lock(&mut *tx, equipment_id).await?;
        let documents: Vec<EquipmentDocument> = equipment
            .documents
            .into_iter()
            .filter(|d| d.id != document_id)
            .collect();
        self.repository
            .equipment
            .set_documents(&mut *tx, equipment_id, &documents)
            .await?;
        tx.commit().await?;

        tracing::info!("Deleted document {} of equipment {}", document_id, equipment_id);
        self.feed.publish(InventoryEvent::EquipmentChanged { equipment_id });
        Ok(())
    }

    /// Store a photo and append its URL
    pub async fn add_photo(&self, equipment_id: i32, upload: Upload) -> AppResult<String> {
        self.check_upload(&upload)?;
        if let Some(content_type) = upload.content_type.as_deref() {
            if !content_type.starts_with("image/") {
                return Err(AppError::Validation(format!(
                    "Photos must be images, got {}",
                    content_type
                )));
            }
        }
        self.repository.equipment.get_by_id(equipment_id).await?;

        let path = storage_path(
            equipment_id,
            AttachmentKind::Photo,
            Utc::now().timestamp_millis(),
            &upload.file_name,
        );
        let blob = self.storage.put(&path, &upload.bytes).await?;

        let appended = async {
            let mut tx = self.repository.begin().await?;
            let equipment = self.repository.equipment.lock(&mut *tx, equipment_id).await?;
            let mut photos = equipment.photos;
            photos.push(blob.url.clone());
            self.repository
                .equipment
                .set_photos(&mut *tx, equipment_id, &photos)
                .await?;
            tx.commit().await?;
            Ok::<_, AppError>(())
        }
        .await;

        if let Err(e) = appended {
            self.discard_blob(&blob.path).await;
            return Err(e);
        }

        tracing::info!("Added photo {} to equipment {}", blob.url, equipment_id);
        self.feed.publish(InventoryEvent::EquipmentChanged { equipment_id });
        Ok(blob.url)
    }

    /// Remove a photo by URL; URLs not issued by our storage are only unlinked
    pub async fn remove_photo(&self, equipment_id: i32, url: &str) -> AppResult<()> {
        let equipment = self.repository.equipment.get_by_id(equipment_id).await?;
        if !equipment.photos.iter().any(|p| p == url) {
            return Err(AppError::NotFound(format!("Photo {} not found", url)));
        }
        if let Some(path) = self.storage.path_from_url(url) {
            self.storage.delete(&path).await?;
        }

        let mut tx = self.repository.begin().await?;
        let equipment = self.repository.equipment.lock(&mut *tx, equipment_id).await?;
        let photos: Vec<String> = equipment.photos.into_iter().filter(|p| p != url).collect();
        self.repository
            .equipment
            .set_photos(&mut *tx, equipment_id, &photos)
            .await?;
        tx.commit().await?;

        self.feed.publish(InventoryEvent::EquipmentChanged { equipment_id });
        Ok(())
    }

    /// Remove a blob whose metadata could not be recorded
    async fn discard_blob(&self, path: &str) {
        if let Err(e) = self.storage.delete(path).await {
            tracing::warn!("Could not remove orphan blob {}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::{test_session, Role};
    use crate::services::storage::MockBlobStore;
    use sqlx::postgres::PgPoolOptions;

    fn service(store: MockBlobStore, max_upload_bytes: usize) -> DocumentsService {
        // Never connects: the checks under test run before any query
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://radiodesk@localhost/unused")
            .unwrap();
        DocumentsService::new(
            Repository::new(pool),
            Arc::new(store),
            ChangeFeed::new(4),
            &StorageConfig {
                max_upload_bytes,
                ..Default::default()
            },
        )
    }

    fn upload(bytes: usize, content_type: &str) -> Upload {
        Upload {
            file_name: "photo.jpg".to_string(),
            content_type: Some(content_type.to_string()),
            bytes: vec![0u8; bytes],
        }
    }

    #[tokio::test]
    async fn test_oversized_upload_never_reaches_storage() {
        let mut store = MockBlobStore::new();
        store.expect_put().never();
        let err = service(store, 4)
            .add_photo(1, upload(5, "image/jpeg"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let mut store = MockBlobStore::new();
        store.expect_put().never();
        let err = service(store, 1024)
            .upload_document(
                1,
                upload(0, "application/pdf"),
                DocumentMetadata::default(),
                &test_session(Role::Staff, None),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_photo_must_be_an_image() {
        let mut store = MockBlobStore::new();
        store.expect_put().never();
        let err = service(store, 1024)
            .add_photo(1, upload(10, "application/pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
