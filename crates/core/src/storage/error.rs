//! Storage error types.

use thiserror::Error;

use super::reporter::FailureReport;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Invalid or ambiguous configuration, or a client that could not be built.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// The backend failed or answered with a non-success status.
    #[error("storage operation failed: {0}")]
    Backend(FailureReport),

    /// Upload content the selected backend cannot accept.
    #[error("unsupported upload content: {0}")]
    UnsupportedContent(String),

    /// A streaming content source failed while being read.
    #[error("failed to read upload content: {0}")]
    ContentRead(#[from] std::io::Error),

    /// A multipart upload failed after its session was opened.
    #[error("multipart upload {upload_id} for '{key}' abandoned (aborted: {aborted}): {report}")]
    MultipartAbandoned {
        /// Object key.
        key: String,
        /// Upload session id.
        upload_id: String,
        /// Whether the session was aborted on the backend.
        aborted: bool,
        /// The failure that ended the session.
        report: Box<FailureReport>,
    },
}

impl StorageError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an unsupported content error.
    #[must_use]
    pub fn unsupported_content(msg: impl Into<String>) -> Self {
        Self::UnsupportedContent(msg.into())
    }

    /// Get the failure report, for errors that came from a backend.
    #[must_use]
    pub fn report(&self) -> Option<&FailureReport> {
        match self {
            Self::Backend(report) => Some(report),
            Self::MultipartAbandoned { report, .. } => Some(report.as_ref()),
            _ => None,
        }
    }

    /// HTTP status returned by the backend, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.report().and_then(|report| report.status)
    }
}

impl From<FailureReport> for StorageError {
    fn from(report: FailureReport) -> Self {
        Self::Backend(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ErrorReporter;

    #[test]
    fn test_backend_error_exposes_report() {
        let report = ErrorReporter::new("media").report_status("get_file", 404, "");
        let err = StorageError::from(report.clone());

        assert_eq!(err.report(), Some(&report));
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().starts_with("storage operation failed: {"));
    }

    #[test]
    fn test_multipart_abandoned_display() {
        let report = ErrorReporter::new("media").report_message("upload_file", "boom", None);
        let err = StorageError::MultipartAbandoned {
            key: "p/a".to_string(),
            upload_id: "u-1".to_string(),
            aborted: true,
            report: Box::new(report),
        };

        let message = err.to_string();
        assert!(message.starts_with("multipart upload u-1 for 'p/a' abandoned (aborted: true)"));
        assert_eq!(err.status(), None);
        assert_eq!(err.report().map(|r| r.message.as_str()), Some("boom"));
    }

    #[test]
    fn test_local_errors_have_no_report() {
        assert!(StorageError::configuration("x").report().is_none());
        assert!(StorageError::unsupported_content("x").report().is_none());
        let io = std::io::Error::other("gone");
        assert!(StorageError::from(io).report().is_none());
    }
}
