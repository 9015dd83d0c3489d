//! Storage trait definitions.

use super::types::{FileMetadata, FileUploadRequest};
use std::future::Future;

/// Generic interface for the image bucket.
pub trait FileStorage: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn upload_file(
        &self,
        request: FileUploadRequest,
    ) -> impl Future<Output = Result<FileMetadata, Self::Error>> + Send;

    /// Returns `false` when nothing was stored under `path`.
    fn delete_file(&self, path: &str) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    fn file_exists(&self, path: &str) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Public URL an object stored under `path` is served from.
    fn public_url(&self, path: &str) -> String;
}
