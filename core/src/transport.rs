//! The capability that executes an `HttpRequest`.
//!
//! # Design
//! `AuthClient` never talks to the network itself; it hands each request to a
//! `Transport`. Any HTTP status is a successful transport outcome, and only
//! the failure to obtain a response (DNS, connect, timeout, unreadable body)
//! is a `TransportError`. Status interpretation belongs to the client.
//!
//! `UreqTransport` is the default, bound to a base URL at construction.
//! Tests and callers that need connection reuse or retries inject their own.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::trace;

use crate::error::BoxError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// A failure to complete the HTTP round trip.
#[derive(Debug, Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// The agent is configured not to turn 4xx/5xx into errors so that those
/// responses reach the client as data.
#[derive(Clone)]
pub struct UreqTransport {
    base_url: String,
    agent: ureq::Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

macro_rules! apply_parts {
    ($builder:expr, $request:expr) => {{
        let mut builder = $builder;
        for (name, value) in &$request.query {
            builder = builder.query(name, value);
        }
        for (name, value) in &$request.headers {
            builder = builder.header(name, value);
        }
        builder
    }};
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url(&request.path);
        trace!(method = %request.method, %url, "ureq dispatch");

        let body = request.body.as_deref().unwrap_or("").as_bytes();
        let result = match request.method {
            HttpMethod::Get => apply_parts!(self.agent.get(&url), request).call(),
            HttpMethod::Delete => apply_parts!(self.agent.delete(&url), request).call(),
            HttpMethod::Post => apply_parts!(self.agent.post(&url), request).send(body),
            HttpMethod::Put => apply_parts!(self.agent.put(&url), request).send(body),
            HttpMethod::Patch => apply_parts!(self.agent.patch(&url), request).send(body),
        };
        let mut response =
            result.map_err(|e| TransportError::with_source(format!("{} {url} failed", request.method), e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::with_source("failed to read response body", e))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
