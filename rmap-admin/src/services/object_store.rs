//! Listing image storage on the local filesystem
//!
//! Objects are written under a root directory and addressed by a relative
//! path of the form `listings/<guid>/<uuid>.<ext>`.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Largest accepted image
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("Object too large: {0} bytes")]
    TooLarge(usize),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an image and return its relative path
    pub async fn put_image(
        &self,
        guid: i64,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, ObjectStoreError> {
        let ext = extension_for(content_type)
            .ok_or_else(|| ObjectStoreError::UnsupportedType(content_type.to_string()))?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ObjectStoreError::TooLarge(bytes.len()));
        }

        let relative = format!("listings/{}/{}.{}", guid, Uuid::new_v4(), ext);
        let full = self.root.join(&relative);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;

        tracing::debug!(path = %relative, size = bytes.len(), "Stored image");
        Ok(relative)
    }

    pub async fn delete(&self, relative: &str) -> Result<(), ObjectStoreError> {
        let full = self.resolve(relative)?;
        tokio::fs::remove_file(full).await?;
        Ok(())
    }

    /// Reject absolute paths and `..` components
    fn resolve(&self, relative: &str) -> Result<PathBuf, ObjectStoreError> {
        let path = Path::new(relative);
        let safe = path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || relative.is_empty() {
            return Err(ObjectStoreError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        let path = store.put_image(7, "image/png", b"\x89PNG").await.unwrap();
        assert!(path.starts_with("listings/7/"));
        assert!(path.ends_with(".png"));
        assert!(dir.path().join(&path).exists());

        store.delete(&path).await.unwrap();
        assert!(!dir.path().join(&path).exists());
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        assert!(matches!(
            store.put_image(1, "image/gif", b"GIF8").await,
            Err(ObjectStoreError::UnsupportedType(_))
        ));
        let big = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(matches!(
            store.put_image(1, "image/jpeg", &big).await,
            Err(ObjectStoreError::TooLarge(_))
        ));
        assert!(matches!(
            store.delete("../etc/passwd").await,
            Err(ObjectStoreError::InvalidPath(_))
        ));
    }
}
