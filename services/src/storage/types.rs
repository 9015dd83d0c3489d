//! File storage types.

/// Metadata for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
}

impl FileMetadata {
    pub(crate) fn for_upload(path: &str, content_type: String, size: u64) -> Self {
        let filename = path.split('/').next_back().unwrap_or(path).to_owned();
        Self {
            id: path.to_owned(),
            filename,
            content_type,
            size,
        }
    }
}

/// Request to upload a file.
#[derive(Debug, Clone)]
pub struct FileUploadRequest {
    pub path: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

impl FileUploadRequest {
    pub fn new(path: impl Into<String>, content: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content,
            content_type: content_type.into(),
        }
    }
}

/// Error type for file storage operations.
#[derive(Debug, thiserror::Error)]
pub enum FileStorageError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),
}
