//! Single entry point over both storage backends.

use std::fmt;

use tracing::info;

use super::aws::S3Client;
use super::config::BucketConfig;
use super::error::StorageError;
use super::hosted::HostedBucket;
use super::object_store::{ObjectStoreBucket, ObjectStoreClient};
use super::types::{FileRef, UploadRequest};

/// Backend a [`Bucket`] is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// S3-compatible bucket
    ObjectStore,
    /// Hosted Ducket service
    Hosted,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectStore => f.write_str("s3"),
            Self::Hosted => f.write_str("ducket"),
        }
    }
}

#[derive(Debug, Clone)]
enum Backend<C> {
    ObjectStore(ObjectStoreBucket<C>),
    Hosted(HostedBucket),
}

/// Storage facade bound to exactly one backend for its whole lifetime.
///
/// Operations are forwarded unchanged; the facade adds no validation.
#[derive(Debug, Clone)]
pub struct Bucket<C = S3Client> {
    backend: Backend<C>,
}

impl Bucket<S3Client> {
    /// Build the adapter selected by the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Configuration`] if the adapter's client cannot be built.
    pub fn new(config: BucketConfig) -> Result<Self, StorageError> {
        let bucket = match &config {
            BucketConfig::ObjectStore(store) => {
                Self::from_object_store(ObjectStoreBucket::from_config(store)?)
            }
            BucketConfig::Hosted(hosted) => Self::from_hosted(HostedBucket::from_config(hosted)?),
        };

        info!(backend = %bucket.kind(), store = config.store(), "storage bucket ready");
        Ok(bucket)
    }
}

impl<C: ObjectStoreClient> Bucket<C> {
    /// Bind an already-built S3-compatible adapter.
    pub fn from_object_store(bucket: ObjectStoreBucket<C>) -> Self {
        Self {
            backend: Backend::ObjectStore(bucket),
        }
    }

    /// Bind an already-built hosted adapter.
    #[must_use]
    pub fn from_hosted(bucket: HostedBucket) -> Self {
        Self {
            backend: Backend::Hosted(bucket),
        }
    }

    /// Get the bound backend.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match &self.backend {
            Backend::ObjectStore(_) => BackendKind::ObjectStore,
            Backend::Hosted(_) => BackendKind::Hosted,
        }
    }

    /// List all file keys (S3) or ids (hosted).
    ///
    /// # Errors
    ///
    /// Returns the bound adapter's error.
    pub async fn list_files(&self) -> Result<Vec<String>, StorageError> {
        match &self.backend {
            Backend::ObjectStore(bucket) => bucket.list_files().await,
            Backend::Hosted(bucket) => bucket.list_files().await,
        }
    }

    /// Fetch a file: the object key (S3) or the file URL (hosted).
    ///
    /// # Errors
    ///
    /// Returns the bound adapter's error.
    pub async fn get_file(&self, file: &FileRef) -> Result<String, StorageError> {
        match &self.backend {
            Backend::ObjectStore(bucket) => bucket.get_file(file).await,
            Backend::Hosted(bucket) => bucket.get_file(file).await,
        }
    }

    /// Upload a file: returns the object key (S3) or the file URL (hosted).
    ///
    /// # Errors
    ///
    /// Returns the bound adapter's error.
    pub async fn upload_file(&self, request: UploadRequest) -> Result<String, StorageError> {
        match &self.backend {
            Backend::ObjectStore(bucket) => bucket.upload_file(request).await,
            Backend::Hosted(bucket) => bucket.upload_file(request).await,
        }
    }

    /// Delete a file.
    ///
    /// # Errors
    ///
    /// Returns the bound adapter's error.
    pub async fn delete_file(&self, file: &FileRef) -> Result<(), StorageError> {
        match &self.backend {
            Backend::ObjectStore(bucket) => bucket.delete_file(file).await,
            Backend::Hosted(bucket) => bucket.delete_file(file).await,
        }
    }
}
