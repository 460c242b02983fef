//! Keys, file content, and request types shared by both backends.

use std::fmt;
use std::io;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, TryStreamExt};

/// Largest body a single `UploadPart` may carry (5 GiB).
pub const MAX_SINGLE_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Streaming byte source accepted as upload content.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Storage key of an object.
///
/// Format: `{project}/{id}` when a non-empty project is given, `{id}` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Compose a key from an id and an optional project prefix.
    #[must_use]
    pub fn new(id: &str, project: Option<&str>) -> Self {
        match project {
            Some(project) if !project.is_empty() => Self(format!("{project}/{id}")),
            _ => Self(id.to_string()),
        }
    }

    /// Check whether a listed key lives under `project/`.
    #[must_use]
    pub fn is_in_project(key: &str, project: &str) -> bool {
        key.strip_prefix(project)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Borrow the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key, returning the owned string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reference to a stored file, used by get and delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    /// File id.
    pub id: String,
    /// Optional project (key prefix).
    pub project: Option<String>,
}

impl FileRef {
    /// Reference a file by id only.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project: None,
        }
    }

    /// Place the reference under a project.
    #[must_use]
    pub fn in_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Storage key for this reference.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.id, self.project.as_deref())
    }
}

/// Content of a file to upload.
///
/// The S3 backend accepts every variant and drains a stream into its single
/// upload part. The hosted backend only accepts materialized content and
/// rejects [`FileContent::Stream`].
pub enum FileContent {
    /// Raw bytes.
    Bytes(Bytes),
    /// Text payload, uploaded as its UTF-8 bytes.
    Text(String),
    /// Streaming byte source.
    Stream(ByteStream),
}

impl FileContent {
    /// Wrap a byte stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self::Stream(Box::pin(stream))
    }

    /// Returns `true` for streaming content.
    #[must_use]
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Short name of the content variant, for logs and errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "text",
            Self::Stream(_) => "stream",
        }
    }

    /// Return the bytes of materialized content without touching a stream.
    ///
    /// A stream is handed back unchanged in `Err`.
    pub fn into_materialized(self) -> Result<Bytes, Self> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Text(text) => Ok(Bytes::from(text)),
            stream @ Self::Stream(_) => Err(stream),
        }
    }

    /// Collect the content into a single buffer, draining a stream if needed.
    ///
    /// Content larger than [`MAX_SINGLE_PART_SIZE`] is rejected.
    ///
    /// # Errors
    ///
    /// Returns the first error yielded by a streaming source, or
    /// [`io::ErrorKind::FileTooLarge`] once the size limit is passed.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        self.into_bytes_within(MAX_SINGLE_PART_SIZE).await
    }

    /// Collect the content into a single buffer of at most `limit` bytes.
    ///
    /// A stream is read only until it passes the limit.
    ///
    /// # Errors
    ///
    /// Returns the first error yielded by a streaming source, or
    /// [`io::ErrorKind::FileTooLarge`] once the size limit is passed.
    pub async fn into_bytes_within(self, limit: u64) -> io::Result<Bytes> {
        match self {
            Self::Bytes(bytes) => check_size(bytes.len() as u64, limit).map(|()| bytes),
            Self::Text(text) => check_size(text.len() as u64, limit).map(|()| Bytes::from(text)),
            Self::Stream(mut stream) => {
                let mut buffer = BytesMut::new();
                let mut total = 0u64;
                while let Some(chunk) = stream.try_next().await? {
                    total += chunk.len() as u64;
                    check_size(total, limit)?;
                    buffer.extend_from_slice(&chunk);
                }
                Ok(buffer.freeze())
            }
        }
    }
}

fn check_size(size: u64, limit: u64) -> io::Result<()> {
    if size > limit {
        return Err(io::Error::new(
            io::ErrorKind::FileTooLarge,
            format!("upload content exceeds the {limit}-byte single-part limit"),
        ));
    }
    Ok(())
}

impl fmt::Debug for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for FileContent {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for FileContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for FileContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Request to upload a file.
#[derive(Debug)]
pub struct UploadRequest {
    /// File content.
    pub content: FileContent,
    /// File id.
    pub id: String,
    /// Content type (MIME type).
    pub content_type: String,
    /// Optional project (key prefix).
    pub project: Option<String>,
}

impl UploadRequest {
    /// Create an upload request without a project.
    pub fn new(
        content: impl Into<FileContent>,
        id: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            id: id.into(),
            content_type: content_type.into(),
            project: None,
        }
    }

    /// Place the upload under a project.
    #[must_use]
    pub fn in_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Storage key for this upload.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.id, self.project.as_deref())
    }
}
