//! Cache interceptor wrapping value-producing operations
//!
//! A `CacheInterceptor` is configured once per operation with a field name and
//! a `CachePolicy`. Each call consults the `CacheStore`, returns the stored
//! value on a hit, and otherwise runs the wrapped operation and stores its
//! result according to the policy.

use chrono::Utc;
use log::{info, warn};
use serde_json::Value;
use std::fmt;
use std::future::Future;

use super::{CacheError, CachePolicy, CacheStore};

/// A call argument as seen by the cache
///
/// Only the designated argument of a `PermanentByArg` field is used, as the
/// key of the nested entry. Integers are keyed by their decimal form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheArg {
    Text(String),
    Int(i64),
}

impl CacheArg {
    /// Returns the string key this argument is stored under
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheArg::Text(text) => write!(f, "{}", text),
            CacheArg::Int(number) => write!(f, "{}", number),
        }
    }
}

impl From<&str> for CacheArg {
    fn from(text: &str) -> Self {
        CacheArg::Text(text.to_string())
    }
}

impl From<String> for CacheArg {
    fn from(text: String) -> Self {
        CacheArg::Text(text)
    }
}

impl From<u32> for CacheArg {
    fn from(number: u32) -> Self {
        CacheArg::Int(i64::from(number))
    }
}

impl From<i64> for CacheArg {
    fn from(number: i64) -> Self {
        CacheArg::Int(number)
    }
}

/// Wraps an operation with a cache consistency policy
#[derive(Debug, Clone)]
pub struct CacheInterceptor {
    /// Name of the field in the store, usually the operation's name
    field: String,
    /// Policy deciding reuse and storage
    policy: CachePolicy,
}

impl CacheInterceptor {
    pub fn new(field: impl Into<String>, policy: CachePolicy) -> Self {
        Self {
            field: field.into(),
            policy,
        }
    }

    /// Returns the store field this interceptor reads and writes
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the configured policy
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Returns the cached value for `args`, or runs `fetch` and caches its result
    ///
    /// # Arguments
    /// * `store` - The cache store to consult and update
    /// * `args` - The wrapped operation's arguments, used by `PermanentByArg`
    /// * `fetch` - The wrapped operation, invoked only on a miss
    ///
    /// # Returns
    /// * `Ok(Value)` - The cached or freshly fetched value
    /// * `Err(E)` - A cache error, or whatever `fetch` failed with
    ///
    /// A miss invokes `fetch` exactly once and persists the store exactly once.
    /// A hit never writes. A failed `fetch` leaves the store untouched.
    ///
    /// A `ValidUntilValue` entry whose timestamp cannot be read (for example a
    /// snapshot list with no snapshots) is an error, not a miss, and keeps
    /// failing until the field is removed from the cache file.
    pub async fn call<F, Fut, E>(
        &self,
        store: &CacheStore,
        args: &[CacheArg],
        fetch: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
        E: From<CacheError>,
    {
        let cached = self.lookup(store, args, unix_now()).map_err(|e| {
            if matches!(e, CacheError::InvalidPath(_) | CacheError::InvalidTimestamp(_)) {
                warn!(
                    "Cached {} cannot be checked: {}. Remove it from {} to fetch it again.",
                    self.field,
                    e,
                    store.path().display()
                );
            }
            e
        })?;
        if let Some(value) = cached {
            info!("Cache for {} was found. Using it.", self.field);
            return Ok(value);
        }

        info!(
            "There is no valid cache for {}. Executing request.",
            self.field
        );
        let value = fetch().await?;
        Ok(self.save(store, args, value)?)
    }

    /// Returns the stored entry if it is valid under the policy at `now`
    ///
    /// An entry that is present but no longer valid counts as absent.
    pub fn lookup(
        &self,
        store: &CacheStore,
        args: &[CacheArg],
        now: f64,
    ) -> Result<Option<Value>, CacheError> {
        let entry = match &self.policy {
            CachePolicy::PermanentByArg { arg } => {
                let key = self.designated_key(args, *arg)?;
                store.get_nested(&self.field, &key)
            }
            CachePolicy::Permanent | CachePolicy::ValidUntilValue { .. } => {
                store.get(&self.field)
            }
        };

        match entry {
            Some(value) if self.policy.is_valid(&value, now)? => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    /// Stores `value` following the policy's storage rule
    ///
    /// `PermanentByArg` replaces only the designated key; the other policies
    /// replace the whole field, embedded timestamp included.
    fn save(&self, store: &CacheStore, args: &[CacheArg], value: Value) -> Result<Value, CacheError> {
        let stored = match &self.policy {
            CachePolicy::PermanentByArg { arg } => {
                let key = self.designated_key(args, *arg)?;
                store.set_nested(&self.field, &key, value)?
            }
            CachePolicy::Permanent | CachePolicy::ValidUntilValue { .. } => {
                store.set(&self.field, value)?
            }
        };
        Ok(stored)
    }

    fn designated_key(&self, args: &[CacheArg], index: usize) -> Result<String, CacheError> {
        args.get(index)
            .map(CacheArg::key)
            .ok_or_else(|| CacheError::MissingArgument {
                field: self.field.clone(),
                index,
            })
    }
}

/// Current Unix time in seconds, with sub-second precision
fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
