//! Contest API client composed from cached, throttled endpoint calls
//!
//! Each operation spells out its own composition: a `CacheInterceptor` with
//! the operation's policy around a call through the shared `Endpoint`.

use log::{error, info};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use super::{error_chain, ApiRequest, Endpoint, EndpointError, HttpTransport, RateLimiter, ResponseMode, Transport};
use crate::cache::{CacheError, CacheInterceptor, CachePolicy, CacheStore, PathSegment, StoreError, ValuePath};
use crate::config::{Config, ConfigError, Credential, DEFAULT_SNAPSHOT_TTL};

/// Errors returned by `ContestClient` operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// Startup configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The cache file could not be opened or written
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A cache policy could not be applied
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A request to the API failed
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// Every snapshot's blob failed to download
    #[error("No snapshot blob could be fetched")]
    NoStatus,

    /// The status has no problem with this id
    #[error("Problem {0} not found")]
    ProblemNotFound(u32),

    /// Our account id does not appear on the leaderboard
    #[error("Account '{0}' is not on the leaderboard")]
    NotOnLeaderboard(String),

    /// A response lacks a field the query relies on
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// One entry of the snapshot list
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SnapshotDescriptor {
    /// Hash of the status blob published with this snapshot
    pub snapshot_hash: String,
    /// Unix time the snapshot was taken, possibly fractional
    pub snapshot_time: f64,
}

/// A snapshot whose blob could not be fetched during status resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFailure {
    pub snapshot_hash: String,
    pub reason: String,
}

/// Outcome of scanning snapshots for a usable status blob
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusResolution {
    /// The newest blob that could be fetched, if any
    pub blob: Option<Value>,
    /// Snapshots skipped on the way, newest first
    pub fallbacks: Vec<SnapshotFailure>,
}

/// Client for the contest API
///
/// Owns the transport (through the `Endpoint`), the rate limiter and the cache
/// store, so all state lives in one explicitly constructed context.
#[derive(Debug)]
pub struct ContestClient<T> {
    endpoint: Endpoint<T>,
    store: CacheStore,
    account_id: String,
    snapshot_ttl: Duration,
}

impl ContestClient<HttpTransport> {
    /// Builds the HTTP client described by `config`
    ///
    /// Reads the credential and opens the cache; either failing is fatal.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let credential = Credential::load(&config.credential_path)?;
        let store = CacheStore::open(&config.cache_path)?;
        let transport = HttpTransport::new(&config.base_url, credential.secret());

        Ok(Self::new(transport, store, credential.account_id())
            .with_rate_limiter(RateLimiter::new(config.min_request_interval))
            .with_snapshot_ttl(config.snapshot_ttl))
    }
}

impl<T: Transport> ContestClient<T> {
    /// Create a client with the default throttle and snapshot freshness
    pub fn new(transport: T, store: CacheStore, account_id: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::new(transport, RateLimiter::default()),
            store,
            account_id: account_id.into(),
            snapshot_ttl: DEFAULT_SNAPSHOT_TTL,
        }
    }

    /// Replace the rate limiter
    pub fn with_rate_limiter(self, limiter: RateLimiter) -> Self {
        let Self {
            endpoint,
            store,
            account_id,
            snapshot_ttl,
        } = self;
        let transport = endpoint.into_transport();
        Self {
            endpoint: Endpoint::new(transport, limiter),
            store,
            account_id,
            snapshot_ttl,
        }
    }

    /// Replace how long the snapshot list stays fresh
    pub fn with_snapshot_ttl(mut self, ttl: Duration) -> Self {
        self.snapshot_ttl = ttl;
        self
    }

    pub fn endpoint(&self) -> &Endpoint<T> {
        &self.endpoint
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Liveness check, cached permanently
    pub async fn hello(&self) -> Result<Value, ClientError> {
        CacheInterceptor::new("hello", CachePolicy::Permanent)
            .call(&self.store, &[], || {
                self.fetch(ApiRequest::Hello, ResponseMode::Structured)
            })
            .await
    }

    /// Snapshot list, refetched once its newest snapshot is older than the TTL
    pub async fn snapshot(&self) -> Result<Value, ClientError> {
        let policy = CachePolicy::ValidUntilValue {
            value_path: ValuePath::new(vec![
                "snapshots".into(),
                PathSegment::Index(-1),
                "snapshot_time".into(),
            ]),
            ttl: self.snapshot_ttl,
        };

        CacheInterceptor::new("snapshot", policy)
            .call(&self.store, &[], || {
                self.fetch(ApiRequest::SnapshotList, ResponseMode::Structured)
            })
            .await
    }

    /// Snapshot descriptors, oldest first
    pub async fn snapshots(&self) -> Result<Vec<SnapshotDescriptor>, ClientError> {
        let list = self.snapshot().await?;
        let snapshots = list
            .get("snapshots")
            .cloned()
            .ok_or_else(|| ClientError::Malformed("snapshot list has no 'snapshots'".to_string()))?;
        serde_json::from_value(snapshots)
            .map_err(|e| ClientError::Malformed(format!("snapshot list: {}", e)))
    }

    /// Content addressed by `hash`, cached permanently per hash
    ///
    /// Structured and text fetches share the same cache field.
    pub async fn blob(&self, hash: &str, mode: ResponseMode) -> Result<Value, ClientError> {
        CacheInterceptor::new("blob", CachePolicy::PermanentByArg { arg: 0 })
            .call(&self.store, &[hash.into()], || async move {
                info!("Trying to get hash: {}", hash);
                self.fetch(
                    ApiRequest::Blob {
                        hash: hash.to_string(),
                    },
                    mode,
                )
                .await
            })
            .await
    }

    /// Uploads a solution; never cached
    pub async fn submit_solution(&self, problem_id: u32, solution: &str) -> Result<Value, ClientError> {
        let request = ApiRequest::SubmitSolution {
            problem_id,
            solution: solution.to_string(),
        };
        self.fetch(request, ResponseMode::Structured).await
    }

    /// Newest status blob that can be fetched, or `None` if all fail
    pub async fn status(&self) -> Result<Option<Value>, ClientError> {
        Ok(self.resolve_status().await?.blob)
    }

    /// Scans snapshots newest to oldest for a fetchable status blob
    pub async fn resolve_status(&self) -> Result<StatusResolution, ClientError> {
        let snapshots = self.snapshots().await?;
        resolve_newest(&snapshots, |hash| async move {
            self.blob(&hash, ResponseMode::Structured).await
        })
        .await
    }

    /// Metadata of problem `id` (1-based) from the current status
    pub async fn problem(&self, id: u32) -> Result<Value, ClientError> {
        CacheInterceptor::new("get_problem", CachePolicy::PermanentByArg { arg: 0 })
            .call(&self.store, &[id.into()], || async move {
                let status = self.status().await?.ok_or(ClientError::NoStatus)?;
                problem_from_status(&status, id)
            })
            .await
    }

    /// Text specification of problem `id`
    pub async fn problem_spec(&self, id: u32) -> Result<Value, ClientError> {
        CacheInterceptor::new("get_problem_spec", CachePolicy::PermanentByArg { arg: 0 })
            .call(&self.store, &[id.into()], || async move {
                let problem = self.problem(id).await?;
                let hash = problem
                    .get("problem_spec_hash")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ClientError::Malformed(format!("problem {} has no 'problem_spec_hash'", id))
                    })?;
                self.blob(hash, ResponseMode::Text).await
            })
            .await
    }

    /// Our 1-based rank on the leaderboard
    pub async fn where_we_are(&self) -> Result<usize, ClientError> {
        let status = self.status().await?.ok_or(ClientError::NoStatus)?;
        rank_of(&status, &self.account_id)
    }

    /// One throttled call, with its payload converted for caching
    async fn fetch(&self, request: ApiRequest, mode: ResponseMode) -> Result<Value, ClientError> {
        Ok(self.endpoint.call(&request, mode).await?.into_value())
    }
}

/// Tries each snapshot's blob from newest to oldest
///
/// A failed request is logged and recorded, and the next older snapshot is
/// tried. Errors that are not request failures end the scan.
pub async fn resolve_newest<F, Fut>(
    snapshots: &[SnapshotDescriptor],
    mut fetch: F,
) -> Result<StatusResolution, ClientError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Value, ClientError>>,
{
    let mut resolution = StatusResolution::default();

    for snapshot in snapshots.iter().rev() {
        match fetch(snapshot.snapshot_hash.clone()).await {
            Ok(blob) => {
                resolution.blob = Some(blob);
                return Ok(resolution);
            }
            Err(ClientError::Endpoint(e)) => {
                error!("{}", error_chain(&e));
                info!("trying to use previous snapshot");
                resolution.fallbacks.push(SnapshotFailure {
                    snapshot_hash: snapshot.snapshot_hash.clone(),
                    reason: error_chain(&e),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(resolution)
}

/// Picks problem `id` (1-based) out of a status blob
pub fn problem_from_status(status: &Value, id: u32) -> Result<Value, ClientError> {
    let problems = status
        .get("problems")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::Malformed("status has no 'problems' list".to_string()))?;

    let index = (id as usize)
        .checked_sub(1)
        .ok_or(ClientError::ProblemNotFound(id))?;
    problems
        .get(index)
        .cloned()
        .ok_or(ClientError::ProblemNotFound(id))
}

/// 1-based position of `account_id` on the status leaderboard
pub fn rank_of(status: &Value, account_id: &str) -> Result<usize, ClientError> {
    let leaderboard = status
        .get("leaderboard")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::Malformed("status has no 'leaderboard' list".to_string()))?;

    leaderboard
        .iter()
        .position(|entry| match entry.get("username") {
            Some(Value::String(name)) => name == account_id,
            Some(Value::Number(number)) => number.to_string() == account_id,
            _ => false,
        })
        .map(|position| position + 1)
        .ok_or_else(|| ClientError::NotOnLeaderboard(account_id.to_string()))
}
