//! Successful conversion output.

use crate::job::Job;
use serde::Serialize;
use std::path::PathBuf;

/// Resource counters reported by the service for a completed job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_cost: Option<u64>,
}

impl ResourceUsage {
    pub(crate) fn from_job(job: &Job) -> Self {
        Self {
            tokens_used: job.tokens_used,
            points_used: job.points_used,
            points_cost: job.points_cost,
        }
    }
}

/// Everything known about a finished conversion.
///
/// Only produced when the job completed *and* the output was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub job_id: String,
    pub input_path: PathBuf,
    /// Where the converted bytes were written.
    pub output_path: PathBuf,
    /// Lowercased input extension.
    pub source_format: String,
    /// Lowercased target format.
    pub target_format: String,
    /// Size of the written file, measured on disk after the write.
    pub file_size: u64,
    /// Server-side processing time, when reported.
    pub processing_time_ms: Option<u64>,
    pub download_url: String,
    pub usage: ResourceUsage,
}
