//! Hosted Ducket service adapter.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use super::config::HostedConfig;
use super::error::StorageError;
use super::reporter::ErrorReporter;
use super::types::{FileRef, UploadRequest};

/// Store identifier used in failure reports.
pub const HOSTED_STORE: &str = "ducket";

#[derive(Debug, Deserialize)]
struct FileList {
    files: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileUrl {
    file_url: String,
}

/// Client for the hosted Ducket REST API.
#[derive(Debug, Clone)]
pub struct HostedBucket {
    http: reqwest::Client,
    api_endpoint: Url,
    reporter: ErrorReporter,
}

impl HostedBucket {
    /// Create an adapter with a bearer-authenticated HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn from_config(config: &HostedConfig) -> Result<Self, StorageError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| StorageError::configuration("api_key is not a valid header value"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StorageError::configuration(e.to_string()))?;

        Self::with_http(http, &config.api_endpoint)
    }

    /// Create an adapter over an existing HTTP client.
    ///
    /// The client is expected to carry the `Authorization` header already.
    ///
    /// # Errors
    ///
    /// Returns an error if the API endpoint is not an absolute base URL.
    pub fn with_http(http: reqwest::Client, api_endpoint: &str) -> Result<Self, StorageError> {
        let api_endpoint = Url::parse(api_endpoint.trim_end_matches('/'))
            .map_err(|e| StorageError::configuration(format!("invalid api_endpoint: {e}")))?;
        if api_endpoint.cannot_be_a_base() {
            return Err(StorageError::configuration(
                "invalid api_endpoint: not a base URL",
            ));
        }

        Ok(Self {
            http,
            api_endpoint,
            reporter: ErrorReporter::new(HOSTED_STORE),
        })
    }

    /// Get the API base URL.
    #[must_use]
    pub fn api_endpoint(&self) -> &str {
        self.api_endpoint.as_str()
    }

    /// List every stored file.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a non-success status, or an
    /// unreadable body.
    #[instrument(skip(self))]
    pub async fn list_files(&self) -> Result<Vec<String>, StorageError> {
        let request = self
            .http
            .get(self.url(["files"]))
            .header(CONTENT_TYPE, "application/json");

        let list: FileList = self.send_json("list_files", request).await?;
        debug!(count = list.files.len(), "listed hosted files");
        Ok(list.files)
    }

    /// Look up a file and return its URL.
    ///
    /// The lookup uses the id only; `project` is not part of the path.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a non-success status, or an
    /// unreadable body.
    #[instrument(skip(self))]
    pub async fn get_file(&self, file: &FileRef) -> Result<String, StorageError> {
        let request = self.http.get(self.file_url(&file.id));

        let found: FileUrl = self.send_json("get_file", request).await?;
        Ok(found.file_url)
    }

    /// Upload a file as a multipart form and return its URL.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnsupportedContent`] for streaming content or an
    /// invalid content type, before any request is sent. Network and status
    /// failures are reported.
    #[instrument(
        skip(self, request),
        fields(id = %request.id, content_type = %request.content_type)
    )]
    pub async fn upload_file(&self, request: UploadRequest) -> Result<String, StorageError> {
        let UploadRequest {
            content,
            id,
            content_type,
            project,
        } = request;

        let body = content.into_materialized().map_err(|content| {
            StorageError::unsupported_content(format!(
                "the hosted service does not accept {} content",
                content.kind()
            ))
        })?;

        let file = Part::bytes(body.to_vec())
            .file_name(id.clone())
            .mime_str(&content_type)
            .map_err(|_| {
                StorageError::unsupported_content(format!("invalid content type '{content_type}'"))
            })?;

        let mut form = Form::new()
            .part("file", file)
            .text("id", id.clone())
            .text("type", content_type);
        if let Some(project) = project {
            form = form.text("project", project);
        }

        let request = self.http.post(self.url(["file"])).multipart(form);
        let uploaded: FileUrl = self.send_json("upload_file", request).await?;

        info!(id = %id, url = %uploaded.file_url, "file uploaded");
        Ok(uploaded.file_url)
    }

    /// Delete a file by id.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or a non-success status.
    #[instrument(skip(self))]
    pub async fn delete_file(&self, file: &FileRef) -> Result<(), StorageError> {
        let request = self.http.delete(self.file_url(&file.id));

        self.send("delete_file", request).await?;
        info!(id = %file.id, "file deleted");
        Ok(())
    }

    /// Append percent-encoded path segments to the API base URL.
    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.api_endpoint.clone();
        // Base URLs are checked in `with_http`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `file/{id}`, where a combined `project/id` keeps its `/` separators.
    fn file_url(&self, id: &str) -> Url {
        self.url(std::iter::once("file").chain(id.split('/')))
    }

    /// Send a request, turning transport failures and non-success statuses into reports.
    async fn send(&self, action: &str, request: RequestBuilder) -> Result<Response, StorageError> {
        let response = request
            .send()
            .await
            .map_err(|e| StorageError::from(self.reporter.report(action, &e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response.text().await.unwrap_or_default();
        Err(self
            .reporter
            .report_status(action, status.as_u16(), &detail)
            .into())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        action: &str,
        request: RequestBuilder,
    ) -> Result<T, StorageError> {
        let response = self.send(action, request).await?;
        let status = response.status().as_u16();

        let body = response
            .bytes()
            .await
            .map_err(|e| StorageError::from(self.reporter.report(action, &e)))?;

        serde_json::from_slice(&body).map_err(|e| {
            let message = format!("unreadable response body: {e}");
            StorageError::from(self.reporter.report_message(action, message, Some(status)))
        })
    }
}
