//! Blob storage for documents and photos

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::{
    config::StorageConfig,
    error::{AppError, AppResult},
};

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub path: String,
    pub url: String,
    pub size_bytes: i64,
    pub sha256: String,
}

/// Object storage seen by the services
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at `path`, returning the public URL and checksum
    async fn put(&self, path: &str, bytes: &[u8]) -> AppResult<StoredBlob>;

    /// Remove the object; removing a missing object is not an error
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Storage path behind a URL issued by `put`, if the URL is ours
    fn path_from_url(&self, url: &str) -> Option<String>;
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Filesystem store; files are served by the HTTP layer under `public_base_url`
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve a relative object path, refusing anything that escapes the root
    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || path.is_empty() {
            return Err(AppError::Validation(format!("Invalid storage path: {}", path)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> AppResult<StoredBlob> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Readers only ever see complete files
        let mut tmp = target.clone().into_os_string();
        tmp.push(".part");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &target).await?;

        tracing::debug!("Stored blob {} ({} bytes)", path, bytes.len());

        Ok(StoredBlob {
            path: path.to_string(),
            url: format!("{}/{}", self.public_base_url, path),
            size_bytes: bytes.len() as i64,
            sha256: sha256_hex(bytes),
        })
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn path_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(root: &Path) -> LocalBlobStore {
        LocalBlobStore::new(&StorageConfig {
            root: root.to_string_lossy().into_owned(),
            public_base_url: "/files/".to_string(),
            max_upload_bytes: 1024,
        })
    }

    fn temp_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("radiodesk-{}-{}", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_put_then_delete() {
        let root = temp_root("put");
        let store = store(&root);

        let blob = store
            .put("equipment/1/documents/1_manual.pdf", b"hello")
            .await
            .unwrap();
        assert_eq!(blob.url, "/files/equipment/1/documents/1_manual.pdf");
        assert_eq!(blob.size_bytes, 5);
        assert_eq!(
            tokio::fs::read(root.join("equipment/1/documents/1_manual.pdf")).await.unwrap(),
            b"hello"
        );

        store.delete("equipment/1/documents/1_manual.pdf").await.unwrap();
        // Deleting twice is fine
        store.delete("equipment/1/documents/1_manual.pdf").await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let store = store(&temp_root("escape"));
        assert!(store.put("../outside.txt", b"x").await.is_err());
        assert!(store.put("/etc/passwd", b"x").await.is_err());
        assert!(store.delete("").await.is_err());
    }

    #[test]
    fn test_path_from_url() {
        let store = store(Path::new("/tmp/unused"));
        assert_eq!(
            store.path_from_url("/files/equipment/2/photos/9_a.jpg").as_deref(),
            Some("equipment/2/photos/9_a.jpg")
        );
        assert_eq!(store.path_from_url("https://elsewhere/x.jpg"), None);
        assert_eq!(store.path_from_url("/files/"), None);
    }
}
