//! Remote image storage using OpenDAL.
//!
//! Board images live in an S3-compatible bucket. Handlers talk to the bucket
//! through the [`FileStorage`] trait so tests can swap in [`MockFileStorage`].

mod mock;
mod s3;
mod traits;
mod types;

pub use mock::{MOCK_PUBLIC_URL, MockFileStorage};
pub use s3::S3FileStorage;
pub use traits::FileStorage;
pub use types::{FileMetadata, FileStorageError, FileUploadRequest};
