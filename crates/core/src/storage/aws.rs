//! [`ObjectStoreClient`] over `aws-sdk-s3`.

use std::error::Error as StdError;
use std::time::Duration;

use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use bytes::Bytes;

use super::config::ObjectStoreConfig;
use super::object_store::{
    ClientError, CompletedPart, ObjectPage, ObjectStoreClient, PresignedRequest,
};

/// Provider name attached to static credentials.
const CREDENTIALS_PROVIDER: &str = "ducket";

/// S3 protocol client built from an [`ObjectStoreConfig`].
#[derive(Debug, Clone)]
pub struct S3Client {
    inner: Client,
}

impl S3Client {
    /// Build a client with static credentials against the configured endpoint.
    #[must_use]
    pub fn from_config(config: &ObjectStoreConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            CREDENTIALS_PROVIDER,
        );

        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(config.force_path_style)
            .build();

        Self {
            inner: Client::from_conf(sdk_config),
        }
    }

    /// Get the underlying SDK client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.inner
    }
}

impl ObjectStoreClient for S3Client {
    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, ClientError> {
        let output = self
            .inner
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(ObjectPage {
            keys: output
                .contents()
                .iter()
                .map(|object| object.key().map(ToString::to_string))
                .collect(),
            next_continuation_token: output.next_continuation_token().map(ToString::to_string),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, ClientError> {
        let output = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(sdk_error)?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| ClientError::new(describe(&e)))?;
        Ok(body.into_bytes())
    }

    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<String, ClientError> {
        let output = self
            .inner
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(sdk_error)?;

        output
            .upload_id()
            .map(ToString::to_string)
            .ok_or_else(|| ClientError::new("backend returned no upload id"))
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String, ClientError> {
        let output = self
            .inner
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(sdk_error)?;

        output
            .e_tag()
            .map(ToString::to_string)
            .ok_or_else(|| ClientError::new("backend returned no ETag for the uploaded part"))
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<(), ClientError> {
        let parts = parts
            .into_iter()
            .map(|part| {
                S3CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(part.e_tag)
                    .build()
            })
            .collect();

        self.inner
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), ClientError> {
        self.inner
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn presign_delete(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<PresignedRequest, ClientError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| ClientError::new(describe(&e)))?;

        let request = self
            .inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(sdk_error)?;

        Ok(PresignedRequest {
            url: request.uri().to_string(),
            method: request.method().to_string(),
            headers: request
                .headers()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        })
    }
}

/// Convert an SDK failure, keeping the HTTP status when the backend answered.
fn sdk_error<E>(err: SdkError<E, HttpResponse>) -> ClientError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
{
    let status = err.raw_response().map(|response| response.status().as_u16());

    let service = err.as_service_error();
    let code = service.and_then(ProvideErrorMetadata::code);
    let message = service.and_then(ProvideErrorMetadata::message);

    let message = match (code, message) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(code), None) => code.to_string(),
        (None, Some(message)) => message.to_string(),
        (None, None) => DisplayErrorContext(&err).to_string(),
    };

    ClientError { message, status }
}

fn describe(err: &(dyn StdError + 'static)) -> String {
    DisplayErrorContext(err).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(endpoint: &str) -> S3Client {
        let config = ObjectStoreConfig::new("media", endpoint, "access_key", "secret_key")
            .with_path_style(true);
        S3Client::from_config(&config)
    }

    #[tokio::test]
    async fn test_presign_delete_is_local_and_signed() {
        let client = client("http://127.0.0.1:9000");

        let request = client
            .presign_delete("media", "mock-project/mock-id", Duration::from_secs(3600))
            .await
            .expect("presign");

        assert_eq!(request.method, "DELETE");
        assert!(request
            .url
            .starts_with("http://127.0.0.1:9000/media/mock-project/mock-id?"));
        assert!(request.url.contains("X-Amz-Expires=3600"));
        assert!(request.url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn test_list_objects_parses_page() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>media</Name>
  <KeyCount>2</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>page-2</NextContinuationToken>
  <Contents><Key>mock-project/mock-id</Key><Size>3</Size></Contents>
  <Contents><Key>top-level</Key><Size>1</Size></Contents>
</ListBucketResult>"#;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/media".to_string()))
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(body)
            .create_async()
            .await;

        let page = client(&server.url())
            .list_objects("media", None)
            .await
            .expect("list");

        mock.assert_async().await;
        assert_eq!(
            page.keys,
            vec![
                Some("mock-project/mock-id".to_string()),
                Some("top-level".to_string())
            ]
        );
        assert_eq!(page.next_continuation_token.as_deref(), Some("page-2"));
    }

    #[tokio::test]
    async fn test_service_error_keeps_status_and_code() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>"#;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/media/missing".to_string()))
            .with_status(404)
            .with_header("content-type", "application/xml")
            .with_body(body)
            .create_async()
            .await;

        let err = client(&server.url())
            .get_object("media", "missing")
            .await
            .unwrap_err();

        assert_eq!(err.status, Some(404));
        assert!(err.message.starts_with("NoSuchKey"));
    }
}
