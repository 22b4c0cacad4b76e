//! # convertorio
//!
//! Async client for the [Convertorio](https://convertorio.com) conversion
//! service: hand it a local file and a target format, get the converted file
//! back on disk.
//!
//! ## Workflow
//!
//! Conversion happens server-side. The client only moves bytes and watches
//! the job:
//!
//! ```text
//! local file
//!  │
//!  ├─ 1. Credentials  POST /v1/convert/upload-url → job id + presigned URL
//!  ├─ 2. Upload       PUT bytes to the presigned URL
//!  ├─ 3. Confirm      POST /v1/convert/confirm → job queued
//!  ├─ 4. Poll         GET /v1/jobs/{id} every 2 s, at most 60 times
//!  └─ 5. Download     GET download URL → write next to the input
//! ```
//!
//! Progress is reported through observers registered per [`EventKind`];
//! failures come back as a [`ConvertError`] variant per failure point.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use convertorio::{ConversionMetadata, ConversionRequest, ConvertorioClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads CONVERTORIO_API_KEY (and optionally CONVERTORIO_BASE_URL)
//!     let client = ConvertorioClient::from_env()?;
//!
//!     let request = ConversionRequest::new("photo.png", "webp").metadata(ConversionMetadata {
//!         quality: Some(85),
//!         ..Default::default()
//!     });
//!     let result = client.convert(&request).await?;
//!     println!("{} ({} bytes)", result.output_path.display(), result.file_size);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `convertorio` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! convertorio = { version = "0.2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod client;
pub mod config;
mod convert;
pub mod error;
pub mod events;
pub mod job;
pub mod output;
mod pipeline;
pub mod request;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::ConvertorioClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ConvertError, ErrorKind, ObserverError, TransportError};
pub use events::{
    ErrorEvent, Event, EventDispatcher, EventKind, ProgressEvent, ProgressStep, StartEvent,
    StatusEvent,
};
pub use job::{Account, Job, JobStatus, ListJobsQuery};
pub use output::{ConversionResult, ResourceUsage};
pub use request::{ConversionMetadata, ConversionRequest};
pub use tokio_util::sync::CancellationToken;
