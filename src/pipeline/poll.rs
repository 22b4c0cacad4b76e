//! Step 4: poll the job until it reaches a terminal status.
//!
//! ## Budget
//!
//! The loop makes at most `max_attempts` status checks, sleeping
//! `poll_interval` between two checks (never before the first one). With the
//! defaults (60 × 2 s) a job gets roughly two minutes. Polling is a retry
//! against "not finished yet", not against errors: a failed status check
//! aborts the conversion immediately.

use super::Context;
use crate::error::ConvertError;
use crate::events::{Event, StatusEvent};
use crate::job::{Job, JobStatus, StatusPayload};
use reqwest::Method;
use tracing::{debug, info, warn};

/// Fallback text when a failed job carries no error message.
const GENERIC_FAILURE: &str = "Conversion failed";

/// Poll until the job completes, and return the completed snapshot.
pub(crate) async fn wait_for_completion(
    ctx: &Context<'_>,
    job_id: &str,
) -> Result<Job, ConvertError> {
    let max_attempts = ctx.config.max_attempts;

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            ctx.cancellable(ctx.delay.sleep(ctx.config.poll_interval))
                .await?;
        }

        let job = fetch_status(ctx, job_id).await?;
        debug!(job_id = %job_id, attempt, max_attempts, status = %job.status, "Status check");

        ctx.emit(Event::Status(StatusEvent {
            job_id: job_id.to_string(),
            status: job.status,
            attempt,
            max_attempts,
        }))?;

        match job.status {
            JobStatus::Completed => {
                if job.download_url.as_deref().is_none_or(str::is_empty) {
                    return Err(ConvertError::StatusFetch {
                        job_id: job_id.to_string(),
                        reason: "job completed without a download URL".into(),
                    });
                }
                info!(job_id = %job_id, attempt, processing_time_ms = ?job.processing_time_ms, "Job completed");
                return Ok(job);
            }
            JobStatus::Failed => {
                let message = job
                    .error_message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| GENERIC_FAILURE.to_string());
                warn!(job_id = %job_id, "Job failed: {}", message);
                return Err(ConvertError::ConversionFailed {
                    job_id: job_id.to_string(),
                    message,
                });
            }
            JobStatus::Expired => {
                return Err(ConvertError::JobExpired {
                    job_id: job_id.to_string(),
                });
            }
            JobStatus::Queued | JobStatus::Processing | JobStatus::Unknown => {}
        }
    }

    warn!(job_id = %job_id, max_attempts, "Job did not finish within the poll budget");
    Err(ConvertError::ConversionTimeout {
        job_id: job_id.to_string(),
        attempts: max_attempts,
    })
}

/// One `GET /v1/jobs/{id}`. Only the status is required in the reply.
pub(crate) async fn fetch_status(ctx: &Context<'_>, job_id: &str) -> Result<Job, ConvertError> {
    let reject = |reason: String| ConvertError::StatusFetch {
        job_id: job_id.to_string(),
        reason,
    };

    let payload: StatusPayload = ctx
        .call_api(
            Method::GET,
            &format!("/v1/jobs/{job_id}"),
            None::<&()>,
            "Failed to get job status",
        )
        .await
        .map_err(|f| f.into_error(reject))?;

    payload
        .job
        .map(|snapshot| snapshot.into_job(job_id))
        .ok_or_else(|| reject("response is missing the job".into()))
}
