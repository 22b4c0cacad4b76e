//! Collaborators the workflow drives but does not implement.
//!
//! The conversion workflow only needs three capabilities from the outside
//! world, each behind a trait so tests (or embedders with their own HTTP
//! stack) can swap them:
//!
//! 1. [`http`]: a single request/response exchange ([`HttpTransport`])
//! 2. [`fs`]: read the input, write the output ([`FileSystem`])
//! 3. [`delay`]: wait between status checks ([`Delay`])
//!
//! The default implementations are reqwest, `tokio::fs` and
//! `tokio::time::sleep`.

pub mod delay;
pub mod fs;
pub mod http;

pub use delay::{Delay, TokioDelay};
pub use fs::{FileSystem, TokioFileSystem};
pub use http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
