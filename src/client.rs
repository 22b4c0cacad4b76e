//! The public client.

use crate::backend::{Delay, FileSystem, HttpTransport, ReqwestTransport, TokioDelay, TokioFileSystem};
use crate::config::ClientConfig;
use crate::convert;
use crate::error::{ConvertError, ObserverError};
use crate::events::{Event, EventDispatcher, EventKind};
use crate::job::{
    is_path_safe_id, Account, AccountPayload, Job, JobListPayload, JobPayload, ListJobsQuery,
};
use crate::output::ConversionResult;
use crate::pipeline::Context;
use crate::request::ConversionRequest;
use reqwest::Method;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Convertorio API client.
///
/// Holds the configuration, the three collaborators (HTTP, filesystem,
/// delay) and the observer registry. Cloning is cheap and clones share the
/// observer registry, so a clone can be moved into a spawned task while
/// observers registered on the original keep receiving its events.
///
/// Concurrent [`convert`](Self::convert) calls are independent; their
/// notifications interleave on the shared observers.
///
/// # Example
///
/// ```rust,no_run
/// use convertorio::{ClientConfig, ConversionRequest, ConvertorioClient, Event, EventKind};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ConvertorioClient::new(ClientConfig::builder("your_api_key").build()?)?;
/// client.on(EventKind::Progress, |event| {
///     if let Event::Progress(p) = event {
///         eprintln!("{}", p.message);
///     }
///     Ok(())
/// });
///
/// let result = client.convert(&ConversionRequest::new("photo.png", "webp")).await?;
/// println!("{} ({} bytes)", result.output_path.display(), result.file_size);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConvertorioClient {
    config: ClientConfig,
    http: Arc<dyn HttpTransport>,
    fs: Arc<dyn FileSystem>,
    delay: Arc<dyn Delay>,
    events: Arc<EventDispatcher>,
}

impl fmt::Debug for ConvertorioClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertorioClient")
            .field("config", &self.config)
            .field("http", &"<dyn HttpTransport>")
            .field("fs", &"<dyn FileSystem>")
            .field("delay", &"<dyn Delay>")
            .field("events", &self.events)
            .finish()
    }
}

impl ConvertorioClient {
    /// Client with the default reqwest / tokio backends.
    pub fn new(config: ClientConfig) -> Result<Self, ConvertError> {
        let http = ReqwestTransport::new(&config)?;
        Ok(Self {
            config,
            http: Arc::new(http),
            fs: Arc::new(TokioFileSystem),
            delay: Arc::new(TokioDelay),
            events: Arc::new(EventDispatcher::new()),
        })
    }

    /// Client configured from `CONVERTORIO_API_KEY` / `CONVERTORIO_BASE_URL`.
    pub fn from_env() -> Result<Self, ConvertError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Replace the HTTP backend.
    pub fn with_transport(mut self, http: Arc<dyn HttpTransport>) -> Self {
        self.http = http;
        self
    }

    /// Replace the filesystem backend.
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Replace the wait primitive used between status checks.
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Register an observer for `kind`. Returning `Err` from the observer
    /// aborts the conversion that emitted the event.
    pub fn on<F>(&self, kind: EventKind, observer: F) -> &Self
    where
        F: Fn(&Event) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        self.events.on(kind, observer);
        self
    }

    /// Upload, convert and download one file.
    ///
    /// # Errors
    /// One [`ConvertError`] variant per failure point; see the error type.
    /// Every failure is reported to `error` observers before it is returned.
    pub async fn convert(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionResult, ConvertError> {
        self.convert_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Like [`convert`](Self::convert), but aborts with
    /// [`ConvertError::Cancelled`] at the next suspension point once `cancel`
    /// fires.
    pub async fn convert_with_cancel(
        &self,
        request: &ConversionRequest,
        cancel: &CancellationToken,
    ) -> Result<ConversionResult, ConvertError> {
        convert::run(&self.context(cancel), request).await
    }

    /// Blocking wrapper around [`convert`](Self::convert).
    ///
    /// Creates a temporary tokio runtime internally, so it must not be
    /// called from inside an async context.
    pub fn convert_sync(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionResult, ConvertError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ConvertError::InvalidConfig(format!("Failed to create tokio runtime: {e}")))?
            .block_on(self.convert(request))
    }

    /// `GET /v1/account`.
    pub async fn get_account(&self) -> Result<Account, ConvertError> {
        const ENDPOINT: &str = "/v1/account";
        let payload: AccountPayload = self
            .query(ENDPOINT, "Failed to get account info")
            .await?;
        payload.account.ok_or_else(|| ConvertError::Api {
            endpoint: ENDPOINT.into(),
            message: "response is missing the account".into(),
        })
    }

    /// `GET /v1/jobs`, newest first as returned by the service.
    pub async fn list_jobs(&self, query: &ListJobsQuery) -> Result<Vec<Job>, ConvertError> {
        let path = format!("/v1/jobs{}", query.to_query_string());
        let payload: JobListPayload = self.query(&path, "Failed to list jobs").await?;
        debug!(count = payload.jobs.len(), "Listed jobs");
        Ok(payload.jobs)
    }

    /// `GET /v1/jobs/{id}`: a single snapshot, no polling.
    pub async fn get_job(&self, job_id: &str) -> Result<Job, ConvertError> {
        if job_id.trim().is_empty() {
            return Err(ConvertError::Validation("job id is required".into()));
        }
        if !is_path_safe_id(job_id) {
            return Err(ConvertError::Validation(format!(
                "job id '{job_id}' contains characters not allowed in a URL path"
            )));
        }
        let path = format!("/v1/jobs/{job_id}");
        let payload: JobPayload = self.query(&path, "Failed to get job").await?;
        payload.job.ok_or_else(|| ConvertError::Api {
            endpoint: path,
            message: "response is missing the job".into(),
        })
    }

    async fn query<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        fallback: &str,
    ) -> Result<T, ConvertError> {
        let cancel = CancellationToken::new();
        self.context(&cancel)
            .call_api(Method::GET, path, None::<&()>, fallback)
            .await
            .map_err(|f| {
                f.into_error(|message| ConvertError::Api {
                    endpoint: path.to_string(),
                    message,
                })
            })
    }

    fn context<'a>(&'a self, cancel: &'a CancellationToken) -> Context<'a> {
        Context {
            config: &self.config,
            http: self.http.as_ref(),
            fs: self.fs.as_ref(),
            delay: self.delay.as_ref(),
            events: &self.events,
            cancel,
        }
    }
}
