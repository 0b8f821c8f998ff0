//! Consistency policies for cached fields
//!
//! A policy decides whether a stored entry may be reused. Validity is a pure
//! function of the entry and, for `ValidUntilValue`, the current time.

use serde_json::Value;
use std::fmt;
use std::time::Duration;

use super::CacheError;

/// One step of a path into a JSON value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object member lookup
    Key(String),
    /// Array lookup; negative indices count from the end
    Index(i64),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<i64> for PathSegment {
    fn from(index: i64) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// Path to a nested value, e.g. `snapshots[-1].snapshot_time`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuePath(Vec<PathSegment>);

impl ValuePath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Walks the path through `value`
    ///
    /// Fails with `CacheError::InvalidPath` when a key is missing, an index is
    /// out of range, or a segment does not match the value's shape.
    pub fn resolve<'a>(&self, value: &'a Value) -> Result<&'a Value, CacheError> {
        let mut current = value;
        for segment in &self.0 {
            let next = match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key),
                (PathSegment::Index(index), Value::Array(items)) => {
                    let len = items.len() as i64;
                    let position = if *index < 0 { len + index } else { *index };
                    if (0..len).contains(&position) {
                        items.get(position as usize)
                    } else {
                        None
                    }
                }
                _ => None,
            };
            current = next.ok_or_else(|| CacheError::InvalidPath(self.to_string()))?;
        }
        Ok(current)
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(_) if i > 0 => write!(f, ".{}", segment)?,
                _ => write!(f, "{}", segment)?,
            }
        }
        Ok(())
    }
}

/// Rule governing when a cached entry may be reused
#[derive(Debug, Clone, PartialEq)]
pub enum CachePolicy {
    /// Valid forever once present
    Permanent,

    /// Stored per value of the designated argument, valid forever per key
    PermanentByArg {
        /// Position of the designated argument in the call's argument list
        arg: usize,
    },

    /// Valid while the timestamp at `value_path` plus `ttl` is in the future
    ValidUntilValue {
        /// Where the Unix timestamp (seconds) lives inside the stored value
        value_path: ValuePath,
        /// How long past that timestamp the value stays usable
        ttl: Duration,
    },
}

impl CachePolicy {
    /// Decides whether a stored `entry` can be returned at time `now`
    ///
    /// `now` is Unix time in seconds. `null` entries are never valid.
    pub fn is_valid(&self, entry: &Value, now: f64) -> Result<bool, CacheError> {
        if entry.is_null() {
            return Ok(false);
        }

        match self {
            CachePolicy::Permanent | CachePolicy::PermanentByArg { .. } => Ok(true),
            CachePolicy::ValidUntilValue { value_path, ttl } => {
                let stamp = value_path.resolve(entry)?;
                let stamp = stamp
                    .as_f64()
                    .ok_or_else(|| CacheError::InvalidTimestamp(value_path.to_string()))?;
                Ok(stamp + ttl.as_secs_f64() > now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot_path() -> ValuePath {
        ValuePath::new(vec!["snapshots".into(), PathSegment::Index(-1), "snapshot_time".into()])
    }

    fn snapshot_policy() -> CachePolicy {
        CachePolicy::ValidUntilValue {
            value_path: snapshot_path(),
            ttl: Duration::from_secs(3600),
        }
    }

    #[test]
    fn test_resolve_negative_index_picks_last() {
        let value = json!({"snapshots": [
            {"snapshot_time": 100},
            {"snapshot_time": 200},
        ]});

        let stamp = snapshot_path().resolve(&value).unwrap();

        assert_eq!(stamp, &json!(200));
    }

    #[test]
    fn test_resolve_positive_index() {
        let path = ValuePath::new(vec!["items".into(), PathSegment::Index(0)]);
        let value = json!({"items": ["a", "b"]});

        assert_eq!(path.resolve(&value).unwrap(), &json!("a"));
    }

    #[test]
    fn test_resolve_empty_array_is_invalid_path() {
        let value = json!({"snapshots": []});

        let result = snapshot_path().resolve(&value);

        assert!(matches!(result, Err(CacheError::InvalidPath(_))));
    }

    #[test]
    fn test_resolve_missing_key_is_invalid_path() {
        let value = json!({"other": 1});

        assert!(matches!(
            snapshot_path().resolve(&value),
            Err(CacheError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_path_display() {
        assert_eq!(snapshot_path().to_string(), "snapshots[-1].snapshot_time");
    }

    #[test]
    fn test_permanent_policies_accept_any_present_value() {
        let value = json!({"anything": true});

        assert!(CachePolicy::Permanent.is_valid(&value, 0.0).unwrap());
        assert!(CachePolicy::PermanentByArg { arg: 0 }
            .is_valid(&value, 0.0)
            .unwrap());
    }

    #[test]
    fn test_null_entry_is_never_valid() {
        assert!(!CachePolicy::Permanent.is_valid(&Value::Null, 0.0).unwrap());
    }

    #[test]
    fn test_valid_until_value_fresh_and_expired() {
        let now = 1_000_000.0;
        let fresh = json!({"snapshots": [{"snapshot_time": now - 100.0}]});
        let expired = json!({"snapshots": [{"snapshot_time": now - 4000.0}]});

        assert!(snapshot_policy().is_valid(&fresh, now).unwrap());
        assert!(!snapshot_policy().is_valid(&expired, now).unwrap());
    }

    #[test]
    fn test_valid_until_value_boundary_is_expired() {
        let now = 10_000.0;
        let entry = json!({"snapshots": [{"snapshot_time": now - 3600.0}]});

        assert!(!snapshot_policy().is_valid(&entry, now).unwrap());
    }

    #[test]
    fn test_valid_until_value_rejects_non_numeric_timestamp() {
        let entry = json!({"snapshots": [{"snapshot_time": "yesterday"}]});

        assert!(matches!(
            snapshot_policy().is_valid(&entry, 0.0),
            Err(CacheError::InvalidTimestamp(_))
        ));
    }
}
