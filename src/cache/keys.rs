//! Cache key definitions.
//!
//! A [`CacheKey`] addresses one shared envelope in the store. Handlers derive
//! keys deterministically from their call arguments; a handler that returns
//! no key opts the call out of caching entirely.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::widget::WidgetCall;

/// Key addressing one cached envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Derive a key from a widget name and the full argument set of a call.
///
/// JSON maps serialize with sorted keys, so two calls with the same arguments
/// always hash identically regardless of kwarg ordering on the wire.
pub fn hash_call(widget: &str, call: &WidgetCall) -> CacheKey {
    let args = serde_json::to_string(&call.args).unwrap_or_default();
    let kwargs = serde_json::to_string(&call.kwargs).unwrap_or_default();
    CacheKey(format!(
        "{widget}:{:x}:{:x}",
        hash_value(&args),
        hash_value(&kwargs)
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn call(args: Vec<serde_json::Value>) -> WidgetCall {
        WidgetCall {
            args,
            kwargs: serde_json::Map::new(),
        }
    }

    #[test]
    fn identical_calls_hash_identically() {
        let a = hash_call("clock", &call(vec![json!("utc")]));
        let b = hash_call("clock", &call(vec![json!("utc")]));
        assert_eq!(a, b);
    }

    #[test]
    fn different_args_produce_different_keys() {
        let a = hash_call("clock", &call(vec![json!("utc")]));
        let b = hash_call("clock", &call(vec![json!("cet")]));
        assert_ne!(a, b);
    }

    #[test]
    fn widget_name_partitions_the_key_space() {
        let a = hash_call("clock", &call(vec![]));
        let b = hash_call("echo", &call(vec![]));
        assert_ne!(a, b);
    }
}
