//! Throttled endpoint calls and response normalization
//!
//! An `Endpoint` owns the transport and the shared `RateLimiter`. Every call
//! is paced, issued, and its raw response turned into a `Payload` or an
//! `EndpointError`.

use log::error;
use serde_json::Value;
use std::future::Future;
use thiserror::Error;

use super::RateLimiter;

/// The calls the contest API accepts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApiRequest {
    /// Liveness check
    Hello,
    /// List of published snapshots, oldest first
    SnapshotList,
    /// Opaque content addressed by hash
    Blob { hash: String },
    /// Solution upload for a problem
    SubmitSolution { problem_id: u32, solution: String },
}

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Failure below HTTP status level (connection refused, timeout, ...)
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client failed; the cause is kept as the error source
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// A non-HTTP transport could not answer
    #[error("{0}")]
    Unavailable(String),
}

/// Performs one request against the remote API
///
/// Implemented by `HttpTransport` for real traffic and by in-memory fakes in
/// tests.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, TransportError>;
}

/// How a successful response body should be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Parse the body as JSON
    #[default]
    Structured,
    /// Return the body verbatim
    Text,
}

/// Decoded body of a successful call
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// Converts the payload into a JSON value for caching
    ///
    /// Text payloads become JSON strings.
    pub fn into_value(self) -> Value {
        match self {
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
        }
    }
}

/// Errors that can occur when calling an endpoint
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The request never produced an HTTP response
    #[error("Request failed: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-200 status
    #[error("Server responded with status {status}: {body}")]
    Connectivity { status: u16, body: String },

    /// The body of a structured response is not valid JSON
    #[error("Failed to parse JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Rate-limited access to the remote API
#[derive(Debug)]
pub struct Endpoint<T> {
    transport: T,
    limiter: RateLimiter,
}

impl<T: Transport> Endpoint<T> {
    pub fn new(transport: T, limiter: RateLimiter) -> Self {
        Self { transport, limiter }
    }

    /// Returns the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the shared rate limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Consumes the endpoint, giving back its transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Issues `request` through the throttle and decodes the response
    ///
    /// # Returns
    /// * `Ok(Payload)` - The decoded body of a 200 response
    /// * `Err(EndpointError)` - Transport failure, non-200 status, or bad JSON
    pub async fn call(&self, request: &ApiRequest, mode: ResponseMode) -> Result<Payload, EndpointError> {
        self.throttled(|| self.transport.execute(request), mode).await
    }

    /// Paces and runs an arbitrary raw call, then normalizes its response
    ///
    /// The limiter records the issue time before `raw` runs and the completion
    /// time once a response is back, whatever its status.
    pub async fn throttled<F, Fut>(&self, raw: F, mode: ResponseMode) -> Result<Payload, EndpointError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RawResponse, TransportError>>,
    {
        self.limiter.throttle().await;
        let response = raw().await?;
        self.limiter.record();
        normalize(response, mode)
    }
}

/// Formats an error followed by each of its causes, joined by `: `
///
/// A cause whose message already ends the text (a wrapper that prints its
/// inner error) is not repeated.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        if !text.ends_with(&message) {
            text.push_str(": ");
            text.push_str(&message);
        }
        source = cause.source();
    }
    text
}

/// Turns a raw response into a payload or a connectivity failure
pub fn normalize(response: RawResponse, mode: ResponseMode) -> Result<Payload, EndpointError> {
    if response.status != 200 {
        error!("Request failed with status {}", response.status);
        error!("{}", response.body);
        return Err(EndpointError::Connectivity {
            status: response.status,
            body: response.body,
        });
    }

    match mode {
        ResponseMode::Text => Ok(Payload::Text(response.body)),
        ResponseMode::Structured => Ok(Payload::Json(serde_json::from_str(&response.body)?)),
    }
}
