//! Step 5: fetch the converted bytes and write them out.
//!
//! The whole body is buffered before anything touches the disk, so a
//! dropped connection surfaces as [`ConvertError::Download`] without leaving
//! a truncated output file.

use super::Context;
use crate::backend::HttpRequest;
use crate::error::ConvertError;
use reqwest::Method;
use std::path::Path;
use tracing::{debug, info};

/// `GET` the job's one-time download URL (no API key).
pub(crate) async fn fetch_output(
    ctx: &Context<'_>,
    job_id: &str,
    download_url: &str,
) -> Result<Vec<u8>, ConvertError> {
    let failed = |reason: String| ConvertError::Download {
        job_id: job_id.to_string(),
        reason,
    };

    let response = ctx
        .cancellable(ctx.http.send(HttpRequest::new(Method::GET, download_url)))
        .await?
        .map_err(|e| failed(e.to_string()))?;

    if !response.is_success() {
        return Err(failed(format!(
            "HTTP {}: {}",
            response.status,
            response.text_snippet()
        )));
    }

    debug!(job_id = %job_id, bytes = response.body.len(), "Download finished");
    Ok(response.body)
}

/// Write `bytes` to `path` (creating parents) and return the on-disk size.
pub(crate) async fn write_output(
    ctx: &Context<'_>,
    path: &Path,
    bytes: &[u8],
) -> Result<u64, ConvertError> {
    let failed = |source: std::io::Error| ConvertError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    ctx.cancellable(ctx.fs.write(path, bytes))
        .await?
        .map_err(failed)?;

    // Measure what actually landed on disk rather than trusting the
    // server's declared size.
    let size = ctx.cancellable(ctx.fs.size(path)).await?.map_err(failed)?;

    info!("Wrote {} ({} bytes)", path.display(), size);
    Ok(size)
}
