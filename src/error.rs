//! Error types for the convertorio library.
//!
//! Two distinct error types reflect two distinct layers:
//!
//! * [`ConvertError`]: what the caller sees. One variant per way a
//!   conversion (or an account/job query) can fail, so callers can `match`
//!   on the failure instead of sniffing message strings.
//!
//! * [`TransportError`]: what a collaborator reports. The HTTP backend only
//!   knows that a request did not complete; the workflow decides which
//!   [`ConvertError`] that becomes depending on the step it happened in.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by event observers.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors returned by the convertorio library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request is malformed (empty target format, unreadable input…).
    #[error("Invalid conversion request: {0}")]
    Validation(String),

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    // ── Workflow errors ───────────────────────────────────────────────────
    /// The service refused to hand out upload credentials.
    #[error("Failed to get upload URL: {message}")]
    UploadSetup { message: String },

    /// Sending the file bytes to the presigned upload target failed.
    #[error("Failed to upload file for job {job_id}: {reason}")]
    UploadTransport { job_id: String, reason: String },

    /// The service did not accept the upload confirmation.
    #[error("Failed to confirm upload for job {job_id}: {message}")]
    Confirm { job_id: String, message: String },

    /// A single status check failed (network error or malformed reply).
    #[error("Failed to get status of job {job_id}: {reason}")]
    StatusFetch { job_id: String, reason: String },

    /// The server reported the job as failed.
    #[error("Conversion failed: {message}")]
    ConversionFailed { job_id: String, message: String },

    /// The server reported the job as expired.
    #[error("Job {job_id} expired")]
    JobExpired { job_id: String },

    /// The job never reached a terminal status within the poll budget.
    #[error("Conversion timeout - job {job_id} did not complete after {attempts} status checks")]
    ConversionTimeout { job_id: String, attempts: u32 },

    /// Fetching the converted bytes failed.
    #[error("Failed to download converted file for job {job_id}: {reason}")]
    Download { job_id: String, reason: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The caller cancelled the conversion.
    #[error("Conversion cancelled")]
    Cancelled,

    /// An event observer returned an error, aborting the workflow.
    #[error("Event observer for '{event}' failed: {source}")]
    Observer {
        event: &'static str,
        #[source]
        source: ObserverError,
    },

    // ── Account / job query errors ────────────────────────────────────────
    /// A query endpoint (`/v1/account`, `/v1/jobs`) returned a negative reply.
    #[error("API request to {endpoint} failed: {message}")]
    Api { endpoint: String, message: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Field-less discriminant of [`ConvertError`], handy for assertions and
/// for forwarding the failure category in notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InputNotFound,
    UploadSetup,
    UploadTransport,
    Confirm,
    StatusFetch,
    ConversionFailed,
    JobExpired,
    ConversionTimeout,
    Download,
    OutputWrite,
    Cancelled,
    Observer,
    Api,
    InvalidConfig,
}

impl ConvertError {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::Validation(_) => ErrorKind::Validation,
            ConvertError::InputNotFound { .. } => ErrorKind::InputNotFound,
            ConvertError::UploadSetup { .. } => ErrorKind::UploadSetup,
            ConvertError::UploadTransport { .. } => ErrorKind::UploadTransport,
            ConvertError::Confirm { .. } => ErrorKind::Confirm,
            ConvertError::StatusFetch { .. } => ErrorKind::StatusFetch,
            ConvertError::ConversionFailed { .. } => ErrorKind::ConversionFailed,
            ConvertError::JobExpired { .. } => ErrorKind::JobExpired,
            ConvertError::ConversionTimeout { .. } => ErrorKind::ConversionTimeout,
            ConvertError::Download { .. } => ErrorKind::Download,
            ConvertError::OutputWrite { .. } => ErrorKind::OutputWrite,
            ConvertError::Cancelled => ErrorKind::Cancelled,
            ConvertError::Observer { .. } => ErrorKind::Observer,
            ConvertError::Api { .. } => ErrorKind::Api,
            ConvertError::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// The server job this error belongs to, when one had been created.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            ConvertError::UploadTransport { job_id, .. }
            | ConvertError::Confirm { job_id, .. }
            | ConvertError::StatusFetch { job_id, .. }
            | ConvertError::ConversionFailed { job_id, .. }
            | ConvertError::JobExpired { job_id }
            | ConvertError::ConversionTimeout { job_id, .. }
            | ConvertError::Download { job_id, .. } => Some(job_id),
            _ => None,
        }
    }
}

/// A failed HTTP exchange, as reported by an [`crate::backend::HttpTransport`].
///
/// Non-2xx replies are *not* transport errors: they come back as a normal
/// [`crate::backend::HttpResponse`] and the workflow classifies them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection, TLS or body-streaming failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built (bad URL, bad header…).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_failed_display_carries_server_message() {
        let e = ConvertError::ConversionFailed {
            job_id: "job-1".into(),
            message: "unsupported colour profile".into(),
        };
        assert_eq!(e.to_string(), "Conversion failed: unsupported colour profile");
        assert_eq!(e.kind(), ErrorKind::ConversionFailed);
        assert_eq!(e.job_id(), Some("job-1"));
    }

    #[test]
    fn timeout_display_mentions_attempts() {
        let e = ConvertError::ConversionTimeout {
            job_id: "job-9".into(),
            attempts: 60,
        };
        let msg = e.to_string();
        assert!(msg.contains("60 status checks"), "got: {msg}");
        assert!(msg.contains("job-9"), "got: {msg}");
    }

    #[test]
    fn input_errors_have_no_job() {
        let e = ConvertError::InputNotFound {
            path: PathBuf::from("missing.png"),
        };
        assert!(e.to_string().contains("missing.png"));
        assert_eq!(e.job_id(), None);
        assert_eq!(ConvertError::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn observer_error_keeps_source() {
        let e = ConvertError::Observer {
            event: "progress",
            source: "bar went away".into(),
        };
        assert!(e.to_string().contains("progress"));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn transport_error_display() {
        let e = TransportError::Timeout("60s elapsed".into());
        assert_eq!(e.to_string(), "request timed out: 60s elapsed");
    }
}
