//! S3 bucket storage over OpenDAL.

use super::mock::MockFileStorage;
use super::traits::FileStorage;
use super::types::{FileMetadata, FileStorageError, FileUploadRequest};
use crate::config::S3Config;
use opendal::{ErrorKind, Operator};

/// Board image bucket.
///
/// Built without credentials it falls back to [`MockFileStorage`] so local
/// development works without a bucket.
#[derive(Clone)]
pub struct S3FileStorage {
    operator: Option<Operator>,
    public_url: String,
    mock: Option<MockFileStorage>,
}

impl S3FileStorage {
    pub fn new(config: &S3Config) -> Result<Self, FileStorageError> {
        let mut builder = opendal::services::S3::default()
            .bucket(&config.bucket)
            .region(&config.region)
            .access_key_id(&config.access_key_id)
            .secret_access_key(&config.secret_access_key);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)
            .map(|op| op.finish())
            .map_err(|e| FileStorageError::ConnectionError(e.to_string()))?;

        Ok(Self {
            operator: Some(operator),
            public_url: config.public_url.clone(),
            mock: None,
        })
    }

    pub fn in_memory() -> Self {
        let mock = MockFileStorage::new();
        Self {
            operator: None,
            public_url: super::mock::MOCK_PUBLIC_URL.to_owned(),
            mock: Some(mock),
        }
    }

    /// Whether the bucket answers a metadata probe.
    pub async fn could_connected(&self) -> bool {
        match &self.operator {
            Some(op) => op.check().await.is_ok(),
            None => true,
        }
    }

    fn operator(&self) -> Result<&Operator, FileStorageError> {
        self.operator.as_ref().ok_or_else(|| {
            FileStorageError::ConnectionError("No bucket configuration provided".to_owned())
        })
    }
}

impl FileStorage for S3FileStorage {
    type Error = FileStorageError;

    async fn upload_file(&self, request: FileUploadRequest) -> Result<FileMetadata, Self::Error> {
        if let Some(mock) = &self.mock {
            return mock.upload_file(request).await;
        }

        let op = self.operator()?;
        let size = request.content.len() as u64;
        op.write_with(&request.path, request.content)
            .content_type(&request.content_type)
            .await
            .map_err(|e| FileStorageError::StorageError(e.to_string()))?;

        Ok(FileMetadata::for_upload(
            &request.path,
            request.content_type,
            size,
        ))
    }

    async fn delete_file(&self, path: &str) -> Result<bool, Self::Error> {
        if let Some(mock) = &self.mock {
            return mock.delete_file(path).await;
        }

        if !self.file_exists(path).await? {
            return Ok(false);
        }

        self.operator()?
            .delete(path)
            .await
            .map_err(|e| FileStorageError::StorageError(e.to_string()))?;
        Ok(true)
    }

    async fn file_exists(&self, path: &str) -> Result<bool, Self::Error> {
        if let Some(mock) = &self.mock {
            return mock.file_exists(path).await;
        }

        match self.operator()?.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FileStorageError::StorageError(e.to_string())),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_url, urlencoding::encode(path))
    }
}
