//! HTTP exchange: one request in, one status + body out.
//!
//! The workflow talks to three authenticated JSON endpoints and two
//! unauthenticated byte transfers (presigned upload, download). All five go
//! through [`HttpTransport::send`]. A non-2xx reply is still an `Ok`
//! [`HttpResponse`]; only a request that never produced a reply is a
//! [`TransportError`].

use crate::config::ClientConfig;
use crate::error::{ConvertError, TransportError};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A reply, whatever its status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as text, lossily decoded and truncated for error messages.
    pub fn text_snippet(&self) -> String {
        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim();
        if text.chars().count() > 200 {
            let cut: String = text.chars().take(199).collect();
            format!("{cut}\u{2026}")
        } else {
            text.to_string()
        }
    }
}

/// Performs HTTP exchanges on behalf of the workflow.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl ReqwestTransport {
    /// Build a client honouring the transport options in `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, ConvertError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConvertError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs: config.request_timeout_secs,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = %request.method, url = %request.url, "HTTP request");

        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        debug!(status, bytes = body.len(), "HTTP response");
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

impl ReqwestTransport {
    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(format!("no reply within {}s", self.timeout_secs))
        } else if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(403, "").is_success());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = HttpRequest::new(Method::PUT, "https://s3/x").header("Content-Type", "image/png");
        assert_eq!(req.header_value("content-type"), Some("image/png"));
        assert_eq!(req.header_value("authorization"), None);
    }

    #[test]
    fn snippet_truncates_long_bodies() {
        let long = "x".repeat(500);
        let snippet = HttpResponse::new(500, long).text_snippet();
        assert_eq!(snippet.chars().count(), 200);
        assert!(snippet.ends_with('\u{2026}'));
    }

    #[test]
    fn transport_builds_from_config() {
        let config = ClientConfig::builder("key").build().unwrap();
        assert!(ReqwestTransport::new(&config).is_ok());
    }
}
