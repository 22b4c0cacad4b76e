//! The conversion workflow.
//!
//! ## Sequence
//!
//! ```text
//! validate ─▶ read input ─▶ [start]
//!   ─▶ [progress] 1. upload credentials
//!   ─▶ [progress] 2. PUT bytes
//!   ─▶ [progress] 3. confirm
//!   ─▶ [progress] 4. poll ──[status]×N
//!   ─▶ [progress] 5. download + write
//!   ─▶ [complete]
//! ```
//!
//! Each step starts only after the previous one's side effect is observed.
//! Any failure, including one raised by an observer, is reported once to the
//! `error` observers and then returned; nothing is retried except the
//! status check loop.
//!
//! No state is shared between runs: every call creates a fresh job, so two
//! identical requests produce two jobs and, without an explicit output
//! path, the second overwrites the first's output.

use crate::error::ConvertError;
use crate::events::{ErrorEvent, Event, ProgressEvent, ProgressStep, StartEvent};
use crate::output::{ConversionResult, ResourceUsage};
use crate::pipeline::upload::{self, FileDescription};
use crate::pipeline::{download, poll, Context};
use crate::request::ConversionRequest;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run one conversion, reporting any failure to the `error` observers.
pub(crate) async fn run(
    ctx: &Context<'_>,
    request: &ConversionRequest,
) -> Result<ConversionResult, ConvertError> {
    match execute(ctx, request).await {
        Ok(result) => Ok(result),
        Err(err) => {
            warn!(input = %request.input_path.display(), "Conversion failed: {}", err);
            let event = Event::Error(ErrorEvent {
                error: err.to_string(),
                kind: err.kind(),
                input_path: request.input_path.clone(),
                target_format: request.target_format.clone(),
            });
            // Observer failures here are logged; the workflow error is returned.
            if let Err(observer_err) = ctx.emit(event) {
                warn!("Error observer failed: {}", observer_err);
            }
            Err(err)
        }
    }
}

async fn execute(
    ctx: &Context<'_>,
    request: &ConversionRequest,
) -> Result<ConversionResult, ConvertError> {
    let total_start = Instant::now();

    // ── Preconditions (no network) ───────────────────────────────────────
    request.validate()?;

    let input_path = request.input_path.as_path();
    let unreadable = |e: std::io::Error| {
        ConvertError::Validation(format!(
            "input '{}' is not a readable file: {}",
            input_path.display(),
            e
        ))
    };

    if !ctx
        .cancellable(ctx.fs.exists(input_path))
        .await?
        .map_err(unreadable)?
    {
        return Err(ConvertError::InputNotFound {
            path: input_path.to_path_buf(),
        });
    }
    let file_size = ctx
        .cancellable(ctx.fs.size(input_path))
        .await?
        .map_err(unreadable)?;
    let bytes = ctx
        .cancellable(ctx.fs.read(input_path))
        .await?
        .map_err(unreadable)?;

    let file_name = request.file_name();
    let source_format = request.source_format();
    let target_format = request.target_format();
    info!(
        "Starting conversion: {} ({} → {}, {} bytes)",
        input_path.display(),
        source_format,
        target_format,
        file_size
    );

    ctx.emit(Event::Start(StartEvent {
        file_name: file_name.clone(),
        source_format: source_format.clone(),
        target_format: target_format.clone(),
    }))?;

    // ── Step 1: Upload credentials ───────────────────────────────────────
    progress(ctx, ProgressStep::RequestingUploadUrl, None, None)?;
    let target = upload::request_upload_target(
        ctx,
        &FileDescription {
            file_name: &file_name,
            source_format: &source_format,
            target_format: &target_format,
            file_size,
            metadata: request.metadata.as_ref(),
        },
    )
    .await?;
    let job_id = target.job_id.clone();

    // ── Step 2: Upload bytes ─────────────────────────────────────────────
    progress(ctx, ProgressStep::Uploading, Some(&job_id), None)?;
    upload::upload_bytes(ctx, &target, &source_format, bytes).await?;

    // ── Step 3: Confirm ──────────────────────────────────────────────────
    progress(ctx, ProgressStep::Confirming, Some(&job_id), None)?;
    let queued_status = upload::confirm(ctx, &job_id).await?;

    // ── Step 4: Poll ─────────────────────────────────────────────────────
    progress(ctx, ProgressStep::Converting, Some(&job_id), queued_status)?;
    let job = poll::wait_for_completion(ctx, &job_id).await?;

    // ── Step 5: Download + write ─────────────────────────────────────────
    progress(ctx, ProgressStep::Downloading, Some(&job_id), None)?;
    let download_url = job.download_url.clone().unwrap_or_default();
    let output = download::fetch_output(ctx, &job_id, &download_url).await?;

    let output_path = request.resolved_output_path();
    let written = download::write_output(ctx, &output_path, &output).await?;

    let result = ConversionResult {
        job_id,
        input_path: request.input_path.clone(),
        output_path,
        source_format,
        target_format,
        file_size: written,
        processing_time_ms: job.processing_time_ms,
        download_url,
        usage: ResourceUsage::from_job(&job),
    };

    info!(
        job_id = %result.job_id,
        "Conversion complete: {} → {} in {}ms",
        result.input_path.display(),
        result.output_path.display(),
        total_start.elapsed().as_millis()
    );

    ctx.emit(Event::Complete(result.clone()))?;
    Ok(result)
}

fn progress(
    ctx: &Context<'_>,
    step: ProgressStep,
    job_id: Option<&str>,
    status: Option<String>,
) -> Result<(), ConvertError> {
    debug!(step = ?step, job_id = ?job_id, "{}", step.message());
    ctx.emit(Event::Progress(ProgressEvent {
        step,
        message: step.message().to_string(),
        job_id: job_id.map(str::to_string),
        status,
    }))
}
