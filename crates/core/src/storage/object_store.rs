//! S3-compatible bucket adapter.
//!
//! Uploads always go through the multipart protocol with a single part:
//! `CreateMultipartUpload` → `UploadPart(1)` → `CompleteMultipartUpload`.
//! Deletes are sent as plain HTTP requests to a presigned `DeleteObject` URL.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::aws::S3Client;
use super::config::ObjectStoreConfig;
use super::error::StorageError;
use super::reporter::{ErrorReporter, FailureReport};
use super::types::{FileRef, UploadRequest};

/// Lifetime of presigned delete URLs.
pub const DELETE_URL_TTL: Duration = Duration::from_secs(3600);

/// Part number used for single-part multipart uploads.
const SINGLE_PART: i32 = 1;

/// Failure of a single object-store protocol call.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    /// Description of the failure.
    pub message: String,
    /// HTTP status of the backend response, if one was received.
    pub status: Option<u16>,
}

impl ClientError {
    /// Create an error without an HTTP status.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Attach the HTTP status of the backend response.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    /// Object keys in backend order. Entries without a key are `None`.
    pub keys: Vec<Option<String>>,
    /// Token for the next page, if the listing is truncated.
    pub next_continuation_token: Option<String>,
}

/// A part acknowledged by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// Part number.
    pub part_number: i32,
    /// Integrity tag returned by `UploadPart`.
    pub e_tag: String,
}

/// Presigned request for a single object operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedRequest {
    /// The presigned URL.
    pub url: String,
    /// HTTP method to use.
    pub method: String,
    /// Headers that must accompany the request.
    pub headers: Vec<(String, String)>,
}

/// Object-store protocol commands used by [`ObjectStoreBucket`].
///
/// Implemented by [`S3Client`] for real buckets.
pub trait ObjectStoreClient: Send + Sync {
    /// `ListObjectsV2`, one page.
    fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> impl Future<Output = Result<ObjectPage, ClientError>> + Send;

    /// `GetObject`, returning the body.
    fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<Bytes, ClientError>> + Send;

    /// `CreateMultipartUpload`, returning the upload id.
    fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> impl Future<Output = Result<String, ClientError>> + Send;

    /// `UploadPart`, returning the part's ETag.
    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> impl Future<Output = Result<String, ClientError>> + Send;

    /// `CompleteMultipartUpload`.
    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// `AbortMultipartUpload`.
    fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Presign a `DeleteObject` request.
    fn presign_delete(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> impl Future<Output = Result<PresignedRequest, ClientError>> + Send;
}

/// A single S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct ObjectStoreBucket<C = S3Client> {
    client: C,
    bucket: String,
    http: reqwest::Client,
    reporter: ErrorReporter,
    delete_url_ttl: Duration,
}

impl ObjectStoreBucket<S3Client> {
    /// Create a bucket adapter backed by `aws-sdk-s3`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client for presigned requests cannot be built.
    pub fn from_config(config: &ObjectStoreConfig) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StorageError::configuration(e.to_string()))?;

        Ok(Self::assemble(
            S3Client::from_config(config),
            config.bucket_name.clone(),
            http,
        ))
    }
}

impl<C: ObjectStoreClient> ObjectStoreBucket<C> {
    /// Create a bucket adapter over any protocol client.
    ///
    /// Presigned requests go through a default HTTP client; see [`Self::with_http`].
    pub fn with_client(client: C, bucket: impl Into<String>) -> Self {
        Self::assemble(client, bucket.into(), reqwest::Client::new())
    }

    fn assemble(client: C, bucket: String, http: reqwest::Client) -> Self {
        Self {
            client,
            reporter: ErrorReporter::new(bucket.clone()),
            bucket,
            http,
            delete_url_ttl: DELETE_URL_TTL,
        }
    }

    /// Use a specific HTTP client for presigned requests.
    #[must_use]
    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Set the lifetime of presigned delete URLs.
    #[must_use]
    pub fn with_delete_url_ttl(mut self, ttl: Duration) -> Self {
        self.delete_url_ttl = ttl;
        self
    }

    /// Get the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get the protocol client.
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// List every object key in the bucket, following continuation tokens.
    ///
    /// Entries without a key, or with an empty one, are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if any listing page fails, or if the backend repeats a
    /// continuation token or sends an empty page that claims more follow.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn list_files(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut continuation_token = None;
        let mut seen_tokens = HashSet::new();
        let mut pages = 0usize;

        loop {
            let page = self
                .client
                .list_objects(&self.bucket, continuation_token.take())
                .await
                .map_err(|e| self.fail("list_files", &e))?;
            pages += 1;

            let Some(token) = page.next_continuation_token else {
                keys.extend(page.keys.into_iter().flatten().filter(|key| !key.is_empty()));
                break;
            };

            if page.keys.is_empty() {
                return Err(self.stalled_listing(format!(
                    "empty listing page {pages} still returned continuation token '{token}'"
                )));
            }
            if !seen_tokens.insert(token.clone()) {
                return Err(self.stalled_listing(format!(
                    "continuation token '{token}' repeated on listing page {pages}"
                )));
            }

            keys.extend(page.keys.into_iter().flatten().filter(|key| !key.is_empty()));
            continuation_token = Some(token);
        }

        debug!(pages, count = keys.len(), "listed bucket");
        Ok(keys)
    }

    /// Fetch an object and return its key.
    ///
    /// The body is read and discarded; success means the object exists and is readable.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be fetched.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn get_file(&self, file: &FileRef) -> Result<String, StorageError> {
        let key = file.key();

        let body = self
            .client
            .get_object(&self.bucket, key.as_str())
            .await
            .map_err(|e| self.fail("get_file", &e))?;

        debug!(key = %key, size = body.len(), "fetched object");
        Ok(key.into_string())
    }

    /// Upload a file as a single-part multipart upload and return its key.
    ///
    /// A streaming source is drained before the session is opened. If the part
    /// upload or the completion fails, the session is aborted.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be read or any protocol step fails.
    #[instrument(
        skip(self, request),
        fields(bucket = %self.bucket, id = %request.id, content_type = %request.content_type)
    )]
    pub async fn upload_file(&self, request: UploadRequest) -> Result<String, StorageError> {
        let key = request.key();
        let body = request.content.into_bytes().await?;

        let upload_id = self
            .client
            .create_multipart_upload(&self.bucket, key.as_str(), &request.content_type)
            .await
            .map_err(|e| self.fail("upload_file.create_multipart_upload", &e))?;
        debug!(key = %key, upload_id = %upload_id, "multipart upload created");

        let e_tag = match self
            .client
            .upload_part(&self.bucket, key.as_str(), &upload_id, SINGLE_PART, body)
            .await
        {
            Ok(e_tag) => e_tag,
            Err(e) => {
                let report = self.report("upload_file.upload_part", &e);
                return Err(self.abandon(key.as_str(), upload_id, report).await);
            }
        };

        let parts = vec![CompletedPart {
            part_number: SINGLE_PART,
            e_tag,
        }];
        if let Err(e) = self
            .client
            .complete_multipart_upload(&self.bucket, key.as_str(), &upload_id, parts)
            .await
        {
            let report = self.report("upload_file.complete_multipart_upload", &e);
            return Err(self.abandon(key.as_str(), upload_id, report).await);
        }

        info!(key = %key, upload_id = %upload_id, "file uploaded");
        Ok(key.into_string())
    }

    /// Delete a file through a presigned `DeleteObject` URL.
    ///
    /// # Errors
    ///
    /// Returns an error if presigning fails, the request cannot be sent, or the
    /// response status is not a success.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn delete_file(&self, file: &FileRef) -> Result<(), StorageError> {
        let key = file.key();

        let presigned = self
            .client
            .presign_delete(&self.bucket, key.as_str(), self.delete_url_ttl)
            .await
            .map_err(|e| self.fail("delete_file.presign", &e))?;

        let method = Method::from_bytes(presigned.method.as_bytes()).map_err(|e| {
            StorageError::from(self.reporter.report("delete_file.presign", &e))
        })?;

        let mut request = self.http.request(method, &presigned.url);
        for (name, value) in &presigned.headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::from(self.reporter.report("delete_file", &e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(self
                .reporter
                .report_status("delete_file", status.as_u16(), &detail)
                .into());
        }

        info!(key = %key, "file deleted");
        Ok(())
    }

    /// Abort an upload session after a failed step.
    ///
    /// A failed abort is reported and logged; the step failure is kept.
    async fn abandon(&self, key: &str, upload_id: String, report: FailureReport) -> StorageError {
        let aborted = match self
            .client
            .abort_multipart_upload(&self.bucket, key, &upload_id)
            .await
        {
            Ok(()) => {
                warn!(key, upload_id = %upload_id, "multipart upload aborted");
                true
            }
            Err(e) => {
                self.report("upload_file.abort_multipart_upload", &e);
                false
            }
        };

        StorageError::MultipartAbandoned {
            key: key.to_string(),
            upload_id,
            aborted,
            report: Box::new(report),
        }
    }

    fn stalled_listing(&self, message: String) -> StorageError {
        StorageError::Backend(self.reporter.report_message("list_files", message, None))
    }

    fn report(&self, action: &str, err: &ClientError) -> FailureReport {
        self.reporter
            .report_message(action, err.message.clone(), err.status)
    }

    fn fail(&self, action: &str, err: &ClientError) -> StorageError {
        StorageError::Backend(self.report(action, err))
    }
}
