//! Remark image storage
//!
//! Images are stored under opaque generated filenames. The plan only keeps
//! the filename, so the store never sees plan or remark ids.

use std::path::PathBuf;

use shared::validate_image_filename;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Accepted image extensions and the content type served for each
const IMAGE_TYPES: [(&str, &str); 4] = [
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
];

#[axum::async_trait]
pub trait BlobStore: Send + Sync {
    async fn save(&self, filename: &str, bytes: &[u8]) -> AppResult<()>;

    /// `NotFound` when no blob has that name
    async fn fetch(&self, filename: &str) -> AppResult<Vec<u8>>;

    /// Deleting a missing blob succeeds
    async fn delete(&self, filename: &str) -> AppResult<()>;
}

/// Blob store backed by a local directory
#[derive(Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the upload directory if it does not exist yet
    pub async fn ensure_root(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::StorageError(format!("Cannot create upload directory: {}", e)))
    }

    fn path_for(&self, filename: &str) -> AppResult<PathBuf> {
        validate_image_filename(filename).map_err(|m| AppError::validation("filename", m))?;
        Ok(self.root.join(filename))
    }
}

#[axum::async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(&self, filename: &str, bytes: &[u8]) -> AppResult<()> {
        let path = self.path_for(filename)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::StorageError(format!("Failed to write {}: {}", filename, e)))
    }

    async fn fetch(&self, filename: &str) -> AppResult<Vec<u8>> {
        let path = self.path_for(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("Image {}", filename)))
            }
            Err(e) => Err(AppError::StorageError(format!("Failed to read {}: {}", filename, e))),
        }
    }

    async fn delete(&self, filename: &str) -> AppResult<()> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::StorageError(format!("Failed to delete {}: {}", filename, e))),
        }
    }
}

/// Lower-cased extension of an uploaded file when it is an accepted image type
pub fn image_extension(original_name: Option<&str>, content_type: Option<&str>) -> Option<&'static str> {
    let from_name = original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .and_then(|ext| IMAGE_TYPES.iter().find(|(e, _)| *e == ext).map(|(e, _)| *e));

    from_name.or_else(|| {
        content_type.and_then(|ct| IMAGE_TYPES.iter().find(|(_, t)| *t == ct).map(|(e, _)| *e))
    })
}

/// Fresh opaque filename for an upload
pub fn generate_filename(extension: &str) -> String {
    format!("{}.{}", Uuid::new_v4(), extension)
}

/// Content type to serve a stored image with
pub fn content_type_for(filename: &str) -> &'static str {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .and_then(|ext| IMAGE_TYPES.iter().find(|(e, _)| *e == ext).map(|(_, t)| *t))
        .unwrap_or("application/octet-stream")
}
