//! Mock file storage for testing.

use super::traits::FileStorage;
use super::types::{FileMetadata, FileStorageError, FileUploadRequest};
use std::collections::HashMap;
use std::sync::{
    Arc, RwLock,
    atomic::{AtomicBool, Ordering},
};

/// Base URL objects in [`MockFileStorage`] are "served" from.
pub const MOCK_PUBLIC_URL: &str = "https://images.weterest.test";

/// In-memory implementation of `FileStorage` for testing and local runs
/// without bucket credentials.
#[derive(Clone, Default)]
pub struct MockFileStorage {
    files: Arc<RwLock<HashMap<String, MockFile>>>,
    fail_uploads: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

#[derive(Clone)]
struct MockFile {
    content: Vec<u8>,
    metadata: FileMetadata,
}

impl MockFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A storage whose uploads always fail.
    pub fn failing() -> Self {
        let storage = Self::default();
        storage.fail_uploads.store(true, Ordering::SeqCst);
        storage
    }

    /// Makes every later delete fail, leaving stored objects in place.
    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.files.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of every stored object.
    pub fn keys(&self) -> Vec<String> {
        self.files
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.files
            .read()
            .expect("lock poisoned")
            .get(path)
            .map(|f| f.content.clone())
    }

    pub fn metadata(&self, path: &str) -> Option<FileMetadata> {
        self.files
            .read()
            .expect("lock poisoned")
            .get(path)
            .map(|f| f.metadata.clone())
    }
}

impl FileStorage for MockFileStorage {
    type Error = FileStorageError;

    async fn upload_file(&self, request: FileUploadRequest) -> Result<FileMetadata, Self::Error> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(FileStorageError::ConnectionError(
                "mock storage rejects uploads".to_owned(),
            ));
        }

        let metadata = FileMetadata::for_upload(
            &request.path,
            request.content_type,
            request.content.len() as u64,
        );

        let file = MockFile {
            content: request.content,
            metadata: metadata.clone(),
        };

        self.files
            .write()
            .expect("lock poisoned")
            .insert(request.path, file);
        Ok(metadata)
    }

    async fn delete_file(&self, path: &str) -> Result<bool, Self::Error> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(FileStorageError::StorageError(
                "mock storage rejects deletes".to_owned(),
            ));
        }

        let mut files = self.files.write().expect("lock poisoned");
        Ok(files.remove(path).is_some())
    }

    async fn file_exists(&self, path: &str) -> Result<bool, Self::Error> {
        let files = self.files.read().expect("lock poisoned");
        Ok(files.contains_key(path))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{MOCK_PUBLIC_URL}/{}", urlencoding::encode(path))
    }
}
