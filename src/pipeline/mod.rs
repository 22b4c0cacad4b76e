//! Protocol stages of a conversion.
//!
//! Each submodule implements one leg of the remote protocol. The stages are
//! strictly sequential; [`crate::convert`] drives them and owns all
//! notification and failure reporting.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──────────────────────────▶ poll ──────────▶ download
//! (credentials → PUT bytes → confirm) (status loop)    (GET → write)
//! ```
//!
//! 1. [`upload`]: `POST /v1/convert/upload-url`, `PUT` to the presigned
//!    target, `POST /v1/convert/confirm`
//! 2. [`poll`]: `GET /v1/jobs/{id}` until a terminal status or the
//!    attempt budget runs out
//! 3. [`download`]: fetch the one-time download URL and write the file
//!
//! Every await in a stage goes through [`Context::cancellable`], so a
//! cancelled token interrupts the pipeline at the next suspension point.

pub mod download;
pub mod poll;
pub mod upload;

use crate::backend::{Delay, FileSystem, HttpRequest, HttpResponse, HttpTransport};
use crate::config::ClientConfig;
use crate::error::ConvertError;
use crate::events::{Event, EventDispatcher};
use crate::job::Envelope;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Borrowed view of a client for the duration of one operation.
pub(crate) struct Context<'a> {
    pub config: &'a ClientConfig,
    pub http: &'a dyn HttpTransport,
    pub fs: &'a dyn FileSystem,
    pub delay: &'a dyn Delay,
    pub events: &'a EventDispatcher,
    pub cancel: &'a CancellationToken,
}

/// Why an authenticated API call did not yield a payload.
#[derive(Debug)]
pub(crate) enum ApiFailure {
    Cancelled,
    /// Transport failure, non-2xx reply, `success: false` or unparsable body.
    Rejected(String),
}

impl ApiFailure {
    /// Turn a rejection into the step-specific error.
    pub fn into_error(self, on_reject: impl FnOnce(String) -> ConvertError) -> ConvertError {
        match self {
            ApiFailure::Cancelled => ConvertError::Cancelled,
            ApiFailure::Rejected(message) => on_reject(message),
        }
    }
}

impl Context<'_> {
    /// Race `fut` against the cancellation token.
    pub async fn cancellable<F: Future>(&self, fut: F) -> Result<F::Output, ConvertError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ConvertError::Cancelled),
            out = fut => Ok(out),
        }
    }

    pub fn emit(&self, event: Event) -> Result<(), ConvertError> {
        self.events.emit(&event)
    }

    /// Call an authenticated JSON endpoint and unwrap its `{success, error}`
    /// envelope. `fallback` is the message used when the server gives none.
    pub async fn call_api<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        fallback: &str,
    ) -> Result<T, ApiFailure>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = HttpRequest::new(method, self.config.endpoint(path))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| ApiFailure::Rejected(format!("could not encode request: {e}")))?;
            request = request.body(bytes);
        }

        let response = self
            .cancellable(self.http.send(request))
            .await
            .map_err(|_| ApiFailure::Cancelled)?
            .map_err(|e| ApiFailure::Rejected(e.to_string()))?;

        read_envelope(&response, fallback).map_err(ApiFailure::Rejected)
    }
}

/// Extract the payload of a `{success, error, …}` reply.
///
/// A reply counts as positive only when the HTTP status is 2xx *and*
/// `success` is true. The server's `error` text wins over `fallback`.
pub(crate) fn read_envelope<T: DeserializeOwned>(
    response: &HttpResponse,
    fallback: &str,
) -> Result<T, String> {
    match response.json::<Envelope<T>>() {
        Ok(env) if env.success && response.is_success() => Ok(env.payload),
        Ok(env) => Err(match env.error {
            Some(message) if !message.is_empty() => message,
            _ if response.is_success() => fallback.to_string(),
            _ => format!("{fallback} (HTTP {})", response.status),
        }),
        Err(e) if response.is_success() => Err(format!("malformed response: {e}")),
        Err(_) => Err(format!(
            "HTTP {}: {}",
            response.status,
            response.text_snippet()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::UploadUrlPayload;

    #[test]
    fn positive_envelope_yields_payload() {
        let resp = HttpResponse::new(
            200,
            r#"{"success":true,"job_id":"job-1","upload_url":"https://s3/put"}"#,
        );
        let payload: UploadUrlPayload = read_envelope(&resp, "fallback").unwrap();
        assert_eq!(payload.job_id.as_deref(), Some("job-1"));
    }

    #[test]
    fn server_error_text_wins() {
        let resp = HttpResponse::new(402, r#"{"success":false,"error":"Insufficient points"}"#);
        let err = read_envelope::<UploadUrlPayload>(&resp, "fallback").unwrap_err();
        assert_eq!(err, "Insufficient points");
    }

    #[test]
    fn missing_error_text_uses_fallback() {
        let resp = HttpResponse::new(200, r#"{"success":false}"#);
        let err = read_envelope::<UploadUrlPayload>(&resp, "Failed to get upload URL").unwrap_err();
        assert_eq!(err, "Failed to get upload URL");
    }

    #[test]
    fn non_json_error_reports_status() {
        let resp = HttpResponse::new(502, "<html>Bad Gateway</html>");
        let err = read_envelope::<UploadUrlPayload>(&resp, "x").unwrap_err();
        assert!(err.starts_with("HTTP 502"), "got: {err}");
    }

    #[test]
    fn non_json_success_is_malformed() {
        let resp = HttpResponse::new(200, "OK");
        let err = read_envelope::<UploadUrlPayload>(&resp, "x").unwrap_err();
        assert!(err.starts_with("malformed response"), "got: {err}");
    }

    #[test]
    fn success_flag_on_error_status_is_not_trusted() {
        let resp = HttpResponse::new(500, r#"{"success":true}"#);
        let err = read_envelope::<UploadUrlPayload>(&resp, "Failed").unwrap_err();
        assert_eq!(err, "Failed (HTTP 500)");
    }
}
