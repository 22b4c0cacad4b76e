//! Steps 1–3: get upload credentials, PUT the bytes, confirm.
//!
//! The upload target is a short-lived presigned URL on the service's object
//! store. It is called without the API key: the signature in the URL is the
//! credential, and an extra `Authorization` header would invalidate it.

use super::Context;
use crate::backend::HttpRequest;
use crate::error::ConvertError;
use crate::job::{is_path_safe_id, ConfirmPayload, UploadUrlPayload, UploadUrlRequest};
use crate::request::ConversionMetadata;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

/// What the service hands back for a new job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UploadTarget {
    pub job_id: String,
    pub upload_url: String,
}

/// Describes the input file to upload.
#[derive(Debug)]
pub(crate) struct FileDescription<'a> {
    pub file_name: &'a str,
    pub source_format: &'a str,
    pub target_format: &'a str,
    pub file_size: u64,
    pub metadata: Option<&'a ConversionMetadata>,
}

/// Step 1: `POST /v1/convert/upload-url`.
pub(crate) async fn request_upload_target(
    ctx: &Context<'_>,
    file: &FileDescription<'_>,
) -> Result<UploadTarget, ConvertError> {
    let body = UploadUrlRequest {
        filename: file.file_name,
        source_format: file.source_format,
        target_format: file.target_format,
        file_size: file.file_size,
        conversion_metadata: file.metadata.filter(|m| !m.is_empty()),
    };

    let payload: UploadUrlPayload = ctx
        .call_api(
            Method::POST,
            "/v1/convert/upload-url",
            Some(&body),
            "Failed to get upload URL",
        )
        .await
        .map_err(|f| f.into_error(|message| ConvertError::UploadSetup { message }))?;

    match (payload.job_id, payload.upload_url) {
        (Some(job_id), _) if !job_id.is_empty() && !is_path_safe_id(&job_id) => {
            Err(ConvertError::UploadSetup {
                message: format!("server issued an unusable job_id '{job_id}'"),
            })
        }
        (Some(job_id), Some(upload_url)) if !job_id.is_empty() && !upload_url.is_empty() => {
            info!(job_id = %job_id, "Upload URL issued");
            Ok(UploadTarget { job_id, upload_url })
        }
        _ => Err(ConvertError::UploadSetup {
            message: "response is missing job_id or upload_url".into(),
        }),
    }
}

/// Step 2: `PUT` the raw bytes to the presigned target.
pub(crate) async fn upload_bytes(
    ctx: &Context<'_>,
    target: &UploadTarget,
    source_format: &str,
    bytes: Vec<u8>,
) -> Result<(), ConvertError> {
    let size = bytes.len();
    let request = HttpRequest::new(Method::PUT, target.upload_url.as_str())
        .header("Content-Type", format!("image/{source_format}"))
        .body(bytes);

    let response = ctx
        .cancellable(ctx.http.send(request))
        .await?
        .map_err(|e| ConvertError::UploadTransport {
            job_id: target.job_id.clone(),
            reason: e.to_string(),
        })?;

    if !response.is_success() {
        return Err(ConvertError::UploadTransport {
            job_id: target.job_id.clone(),
            reason: format!("HTTP {}: {}", response.status, response.text_snippet()),
        });
    }

    debug!(job_id = %target.job_id, bytes = size, "Upload finished");
    Ok(())
}

/// Step 3: `POST /v1/convert/confirm`. Returns the status the job was
/// queued with, when the service reports one.
pub(crate) async fn confirm(ctx: &Context<'_>, job_id: &str) -> Result<Option<String>, ConvertError> {
    let payload: ConfirmPayload = ctx
        .call_api(
            Method::POST,
            "/v1/convert/confirm",
            Some(&json!({ "job_id": job_id })),
            "Failed to confirm upload",
        )
        .await
        .map_err(|f| {
            f.into_error(|message| ConvertError::Confirm {
                job_id: job_id.to_string(),
                message,
            })
        })?;

    info!(job_id = %job_id, status = ?payload.status, "Upload confirmed");
    Ok(payload.status)
}
