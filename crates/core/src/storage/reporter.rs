//! Structured failure reporting.
//!
//! Both adapters hold an [`ErrorReporter`] and route every backend failure
//! through it. The reporter only describes and logs a failure; whether the
//! calling operation aborts is decided at the call site.

use std::error::Error as StdError;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

/// Message used when a failure carries no description.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Structured description of a failed storage action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    /// Store identifier (bucket name or hosted service name).
    pub bucket: String,
    /// Action that failed, e.g. `upload_file.upload_part`.
    pub action: String,
    /// Best-effort failure message.
    pub message: String,
    /// HTTP status, when the backend answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// When the failure was reported.
    pub at: DateTime<Utc>,
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{} failed on {}: {}", self.action, self.bucket, self.message),
        }
    }
}

/// Builds and logs [`FailureReport`]s for one store.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    store: String,
}

impl ErrorReporter {
    /// Create a reporter for the given store identifier.
    #[must_use]
    pub fn new(store: impl Into<String>) -> Self {
        Self {
            store: store.into(),
        }
    }

    /// Get the store identifier.
    #[must_use]
    pub fn store(&self) -> &str {
        &self.store
    }

    /// Report a caught error, including its source chain in the message.
    pub fn report(&self, action: &str, err: &(dyn StdError + 'static)) -> FailureReport {
        self.report_message(action, describe(err), None)
    }

    /// Report a non-success HTTP response.
    pub fn report_status(&self, action: &str, status: u16, detail: &str) -> FailureReport {
        let message = if detail.trim().is_empty() {
            format!("backend responded with status {status}")
        } else {
            format!("backend responded with status {status}: {}", detail.trim())
        };
        self.report_message(action, message, Some(status))
    }

    /// Report a failure from its message and optional HTTP status.
    pub fn report_message(
        &self,
        action: &str,
        message: impl Into<String>,
        status: Option<u16>,
    ) -> FailureReport {
        let message = message.into();
        let report = FailureReport {
            bucket: self.store.clone(),
            action: action.to_string(),
            message: if message.trim().is_empty() {
                UNKNOWN_ERROR.to_string()
            } else {
                message
            },
            status,
            at: Utc::now(),
        };

        error!(
            bucket = %report.bucket,
            action = %report.action,
            status = ?report.status,
            message = %report.message,
            "storage action failed"
        );

        report
    }
}

/// Join an error and its sources into one line.
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !message.contains(&text) {
            if !message.is_empty() {
                message.push_str(": ");
            }
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Debug)]
    struct Wrapped(io::Error);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("request failed")
        }
    }

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_report_fields() {
        let reporter = ErrorReporter::new("media");
        let err = io::Error::other("connection reset");

        let report = reporter.report("upload_file", &err);

        assert_eq!(report.bucket, "media");
        assert_eq!(report.action, "upload_file");
        assert_eq!(report.message, "connection reset");
        assert_eq!(report.status, None);
        assert!(report.at <= Utc::now());
    }

    #[test]
    fn test_report_includes_source_chain() {
        let reporter = ErrorReporter::new("media");
        let err = Wrapped(io::Error::other("dns failure"));

        let report = reporter.report("list_files", &err);
        assert_eq!(report.message, "request failed: dns failure");
    }

    #[test]
    fn test_empty_message_falls_back_to_unknown() {
        let reporter = ErrorReporter::new("media");

        let report = reporter.report_message("get_file", "", None);
        assert_eq!(report.message, UNKNOWN_ERROR);

        let err = io::Error::other("");
        assert_eq!(reporter.report("get_file", &err).message, UNKNOWN_ERROR);
    }

    #[test]
    fn test_report_status() {
        let reporter = ErrorReporter::new("ducket");

        let report = reporter.report_status("delete_file", 404, "  not found\n");
        assert_eq!(report.status, Some(404));
        assert_eq!(report.message, "backend responded with status 404: not found");

        let bare = reporter.report_status("delete_file", 500, "");
        assert_eq!(bare.message, "backend responded with status 500");
    }

    #[test]
    fn test_display_is_json() {
        let reporter = ErrorReporter::new("media");
        let report = reporter.report_status("get_file", 403, "denied");

        let value: serde_json::Value =
            serde_json::from_str(&report.to_string()).expect("display renders JSON");
        assert_eq!(value["bucket"], "media");
        assert_eq!(value["action"], "get_file");
        assert_eq!(value["status"], 403);
        assert!(value["at"].is_string());

        let no_status = reporter.report_message("get_file", "boom", None);
        let value: serde_json::Value =
            serde_json::from_str(&no_status.to_string()).expect("display renders JSON");
        assert!(value.get("status").is_none());
    }
}
