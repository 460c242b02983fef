//! Unified object storage for Ducket.
//!
//! A [`Bucket`] binds to exactly one backend, chosen once from a
//! [`BucketConfig`]:
//! - S3-compatible buckets: Cloudflare R2, AWS S3, MinIO
//! - The hosted Ducket file service (REST over HTTPS)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Bucket (facade)                         │
//! │   list_files()  get_file()  upload_file()  delete_file()         │
//! ├────────────────────────────────┬────────────────────────────────┤
//! │ ObjectStoreBucket<C>           │ HostedBucket                   │
//! │  ListObjectsV2 / GetObject     │  GET /files   GET /file/{id}   │
//! │  CreateMultipartUpload         │  POST /file (multipart form)   │
//! │  UploadPart (part 1)           │  DELETE /file/{id}             │
//! │  CompleteMultipartUpload       │                                │
//! │  presigned DeleteObject        │                                │
//! ├────────────────────────────────┴────────────────────────────────┤
//! │                 ErrorReporter (structured failures)              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod aws;
mod config;
mod error;
mod facade;
mod hosted;
mod object_store;
mod reporter;
mod types;

#[cfg(test)]
mod round_trip_tests;

pub use aws::S3Client;
pub use config::{BucketConfig, HostedConfig, ObjectStoreConfig};
pub use error::StorageError;
pub use facade::{BackendKind, Bucket};
pub use hosted::{HOSTED_STORE, HostedBucket};
pub use object_store::{
    ClientError, CompletedPart, DELETE_URL_TTL, ObjectPage, ObjectStoreBucket, ObjectStoreClient,
    PresignedRequest,
};
pub use reporter::{ErrorReporter, FailureReport, UNKNOWN_ERROR};
pub use types::{
    ByteStream, FileContent, FileRef, MAX_SINGLE_PART_SIZE, ObjectKey, UploadRequest,
};
