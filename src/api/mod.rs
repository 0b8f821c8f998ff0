//! Remote contest API access
//!
//! This module contains the request throttle, the endpoint layer that paces
//! and normalizes calls, the HTTP transport, and the `ContestClient` that
//! composes them with the cache.

pub mod client;
pub mod endpoint;
pub mod throttle;
pub mod transport;

pub use client::{ClientError, ContestClient, SnapshotDescriptor, SnapshotFailure, StatusResolution};
pub use endpoint::{
    error_chain, ApiRequest, Endpoint, EndpointError, Payload, RawResponse, ResponseMode, Transport,
    TransportError,
};
pub use throttle::{RateLimiter, DEFAULT_MIN_INTERVAL};
pub use transport::HttpTransport;
