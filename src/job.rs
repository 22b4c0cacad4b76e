//! Server-side state: jobs, accounts and the JSON envelopes they travel in.
//!
//! The client never mutates a [`Job`]; it only observes snapshots returned by
//! `GET /v1/jobs/{id}`.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;

/// Lifecycle state of a conversion job, as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a worker.
    Queued,
    /// A worker is converting the file.
    Processing,
    /// Output is ready at the job's download URL.
    Completed,
    /// Conversion failed; see the job's error message.
    Failed,
    /// The job or its output is no longer available.
    Expired,
    /// Any status this client does not know about (e.g. `pending`, `uploaded`).
    /// Treated as non-terminal.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// `completed`, `failed` and `expired` are final.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Expired
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Expired => "expired",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a conversion job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(alias = "job_id")]
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, alias = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    /// One-time download reference, present once the job is completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_cost: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Account details returned by `GET /v1/account`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(alias = "user_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, alias = "points_balance", skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_conversions_remaining: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_conversions: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Pagination and filter for `GET /v1/jobs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListJobsQuery {
    /// Page size, clamped to 1–100. Default: 50.
    pub limit: u32,
    pub offset: u32,
    pub status: Option<JobStatus>,
}

impl Default for ListJobsQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            status: None,
        }
    }
}

impl ListJobsQuery {
    /// Render as a query string, including the leading `?`.
    pub(crate) fn to_query_string(&self) -> String {
        let mut q = format!("?limit={}&offset={}", self.limit.clamp(1, 100), self.offset);
        if let Some(status) = self.status {
            q.push_str("&status=");
            q.push_str(status.as_str());
        }
        q
    }
}

// ── Wire envelopes ───────────────────────────────────────────────────────

/// `{ "success": …, "error": … }` plus an endpoint-specific payload.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadUrlPayload {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub upload_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmPayload {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobPayload {
    #[serde(default)]
    pub job: Option<Job>,
}

/// `GET /v1/jobs/{id}` reply as read by the poll loop.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusPayload {
    #[serde(default)]
    pub job: Option<StatusSnapshot>,
}

/// Lenient view of a job for polling.
///
/// Only `status` is required. Both id spellings and both error spellings
/// may be present at once, and counters may arrive as floats.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusSnapshot {
    status: JobStatus,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    original_filename: Option<String>,
    #[serde(default)]
    source_format: Option<String>,
    #[serde(default)]
    target_format: Option<String>,
    #[serde(default)]
    file_size: Option<Number>,
    #[serde(default)]
    processing_time_ms: Option<Number>,
    #[serde(default)]
    tokens_used: Option<Number>,
    #[serde(default)]
    points_used: Option<Number>,
    #[serde(default)]
    points_cost: Option<Number>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    completed_at: Option<String>,
    #[serde(default)]
    expires_at: Option<String>,
}

impl StatusSnapshot {
    /// Build a [`Job`] for `job_id`, the id the client polled.
    pub fn into_job(self, job_id: &str) -> Job {
        let non_empty = |s: Option<String>| s.filter(|m| !m.trim().is_empty());
        Job {
            id: job_id.to_string(),
            status: self.status,
            original_filename: self.original_filename,
            source_format: self.source_format,
            target_format: self.target_format,
            file_size: count(self.file_size),
            error_message: non_empty(self.error_message).or_else(|| non_empty(self.error)),
            processing_time_ms: count(self.processing_time_ms),
            download_url: self.download_url,
            tokens_used: count(self.tokens_used),
            points_used: count(self.points_used),
            points_cost: count(self.points_cost),
            created_at: self.created_at,
            completed_at: self.completed_at,
            expires_at: self.expires_at,
        }
    }
}

/// Non-negative JSON number as `u64`, rounding floats.
fn count(n: Option<Number>) -> Option<u64> {
    let n = n?;
    n.as_u64().or_else(|| {
        n.as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u64::MAX as f64)
            .map(|f| f.round() as u64)
    })
}

/// Whether `id` can be placed in a URL path segment as-is.
pub(crate) fn is_path_safe_id(id: &str) -> bool {
    !id.is_empty()
        && !id.chars().any(|c| {
            matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control()
        })
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobListPayload {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountPayload {
    #[serde(default)]
    pub account: Option<Account>,
}

/// Request body for `POST /v1/convert/upload-url`.
#[derive(Debug, Serialize)]
pub(crate) struct UploadUrlRequest<'a> {
    pub filename: &'a str,
    pub source_format: &'a str,
    pub target_format: &'a str,
    pub file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_metadata: Option<&'a crate::request::ConversionMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Expired.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(!JobStatus::Unknown.is_terminal());
    }

    #[test]
    fn unknown_status_is_tolerated() {
        let job: Job = serde_json::from_value(json!({"id": "j", "status": "uploaded"})).unwrap();
        assert_eq!(job.status, JobStatus::Unknown);
    }

    #[test]
    fn completed_job_deserialises() {
        let env: Envelope<JobPayload> = serde_json::from_value(json!({
            "success": true,
            "job": {
                "id": "job-1",
                "status": "completed",
                "download_url": "https://x/y",
                "processing_time_ms": 340,
                "tokens_used": 2
            }
        }))
        .unwrap();
        assert!(env.success);
        let job = env.payload.job.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.download_url.as_deref(), Some("https://x/y"));
        assert_eq!(job.processing_time_ms, Some(340));
        assert_eq!(job.tokens_used, Some(2));
    }

    #[test]
    fn job_error_alias() {
        let job: Job =
            serde_json::from_value(json!({"job_id": "j", "status": "failed", "error": "bad input"}))
                .unwrap();
        assert_eq!(job.id, "j");
        assert_eq!(job.error_message.as_deref(), Some("bad input"));
    }

    #[test]
    fn negative_envelope_keeps_error() {
        let env: Envelope<UploadUrlPayload> =
            serde_json::from_value(json!({"success": false, "error": "Insufficient points"}))
                .unwrap();
        assert!(!env.success);
        assert_eq!(env.error.as_deref(), Some("Insufficient points"));
        assert!(env.payload.job_id.is_none());
    }

    #[test]
    fn status_snapshot_tolerates_both_spellings() {
        let env: Envelope<StatusPayload> = serde_json::from_value(json!({
            "success": true,
            "job": {
                "id": "job-1",
                "job_id": "job-1",
                "status": "failed",
                "error": "bad",
                "error_message": "bad profile"
            }
        }))
        .unwrap();
        let job = env.payload.job.unwrap().into_job("job-1");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("bad profile"));
    }

    #[test]
    fn status_snapshot_falls_back_to_error_field() {
        let snap: StatusSnapshot =
            serde_json::from_value(json!({"status": "failed", "error_message": "", "error": "bad"}))
                .unwrap();
        assert_eq!(snap.into_job("j").error_message.as_deref(), Some("bad"));
    }

    #[test]
    fn status_snapshot_without_id_uses_polled_id() {
        let snap: StatusSnapshot = serde_json::from_value(json!({
            "status": "completed",
            "download_url": "https://x/y",
            "processing_time_ms": 340.0,
            "points_used": 1.6,
            "tokens_used": -3
        }))
        .unwrap();
        let job = snap.into_job("job-9");
        assert_eq!(job.id, "job-9");
        assert_eq!(job.processing_time_ms, Some(340));
        assert_eq!(job.points_used, Some(2));
        assert_eq!(job.tokens_used, None);
    }

    #[test]
    fn path_safe_ids() {
        assert!(is_path_safe_id("3f2a9c1e-77d0-4b1e-9d7a-1c2b3d4e5f60"));
        assert!(!is_path_safe_id(""));
        assert!(!is_path_safe_id("../account"));
        assert!(!is_path_safe_id("job?x=1"));
        assert!(!is_path_safe_id("job#frag"));
        assert!(!is_path_safe_id("job 1"));
    }

    #[test]
    fn account_accepts_points_balance() {
        let acct: Account =
            serde_json::from_value(json!({"user_id": "u1", "points_balance": 120})).unwrap();
        assert_eq!(acct.id, "u1");
        assert_eq!(acct.points, Some(120));
    }

    #[test]
    fn list_query_string() {
        assert_eq!(
            ListJobsQuery::default().to_query_string(),
            "?limit=50&offset=0"
        );
        let q = ListJobsQuery {
            limit: 500,
            offset: 20,
            status: Some(JobStatus::Failed),
        };
        assert_eq!(q.to_query_string(), "?limit=100&offset=20&status=failed");
    }
}
