//! Cache module for storing API responses to disk
//!
//! This module provides the file-backed `CacheStore`, the `CachePolicy`
//! consistency rules, and the `CacheInterceptor` that applies a policy around
//! any value-producing operation.

mod interceptor;
mod policy;
mod store;

use thiserror::Error;

pub use interceptor::{CacheArg, CacheInterceptor};
pub use policy::{CachePolicy, PathSegment, ValuePath};
pub use store::{CacheStore, StoreError};

/// Errors raised while applying a cache policy
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store failed to load or persist
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A `PermanentByArg` field was called without its designated argument
    #[error("Cache field '{field}' expects an argument at position {index}")]
    MissingArgument { field: String, index: usize },

    /// The value path does not exist in the stored value
    #[error("Value path '{0}' not found in cached value")]
    InvalidPath(String),

    /// The value at the path is not a number
    #[error("Value at '{0}' is not a numeric timestamp")]
    InvalidTimestamp(String),
}
