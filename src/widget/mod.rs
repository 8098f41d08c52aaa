//! Widget handler contract.
//!
//! A widget splits its work into a cacheable phase (shared across requests
//! with the same cache key) and an uncacheable phase (recomputed per
//! request). [`Widget`] is the capability interface handlers implement;
//! [`runtime::WidgetRuntime`] drives the cache-read and invocation pipeline.

pub mod builtin;
pub mod runtime;

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::cache::CacheKey;
use crate::domain::error::WidgetError;
use crate::domain::widget::{Envelope, WidgetResult, WidgetStatus};

pub use runtime::{WidgetOutput, WidgetRuntime};

/// Positional and keyword arguments of one widget invocation.
///
/// Reserved (`__`-prefixed) kwargs are stripped by the router before a call
/// is constructed, so handler code never observes control keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WidgetCall {
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl WidgetCall {
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.kwargs.get(name)
    }
}

/// Per-request data available to the uncacheable phase.
///
/// Deliberately absent from the cacheable phase: anything derived from it
/// would leak one caller's state into the shared cache.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub headers: HeaderMap,
}

/// A unit of deferred page content.
///
/// Every method has a default body; a minimal widget overrides only
/// `template` and `uncacheable`. Overriding `cacheable` without also
/// overriding `cache_key` leaves the widget uncached, since the default key
/// is the no-cache sentinel.
#[async_trait]
pub trait Widget: Send + Sync {
    /// Template payload returned with every envelope.
    fn template(&self) -> &str {
        ""
    }

    /// When `false`, the runtime never consults the cache store and each
    /// invocation starts from a fresh default envelope.
    fn use_cache(&self) -> bool {
        true
    }

    /// Baseline envelope seeding the cacheable phase.
    fn default_response(&self, _call: &WidgetCall) -> Envelope {
        Envelope::new(self.template())
    }

    /// Deterministic key for this argument combination. `None` means this
    /// call must never be cached.
    fn cache_key(&self, _call: &WidgetCall) -> Option<CacheKey> {
        None
    }

    /// Compute the shareable portion of the response.
    ///
    /// Must be idempotent and free of per-request state: its output is
    /// served to every caller with the same cache key.
    async fn cacheable(
        &self,
        envelope: Envelope,
        _call: &WidgetCall,
    ) -> Result<Envelope, WidgetError> {
        Ok(envelope)
    }

    /// Compute the request-specific portion of the response. Always invoked,
    /// cache hit or miss.
    async fn uncacheable(
        &self,
        _ctx: &RequestContext,
        envelope: Envelope,
        _call: &WidgetCall,
    ) -> Result<Envelope, WidgetError> {
        Ok(envelope)
    }

    /// Recovery point when an invocation fails.
    ///
    /// Receives a partial result already carrying the entry's id, plus the
    /// request context and the stripped call so overrides can render partial
    /// or alternate content from them; the returned result is used verbatim
    /// in the batch response. The default attaches structured diagnostics
    /// (kind, message, span trace) under the debug flag and an opaque
    /// message otherwise.
    fn on_error(
        &self,
        error: &WidgetError,
        mut partial: WidgetResult,
        _ctx: &RequestContext,
        _call: &WidgetCall,
        debug: bool,
    ) -> WidgetResult {
        if debug {
            let mut detail = Map::new();
            detail.insert("kind".to_string(), Value::String(error.kind().to_string()));
            detail.insert("message".to_string(), Value::String(error.to_string()));
            detail.insert("trace".to_string(), Value::String(error.trace().to_string()));
            partial.insert("error", Value::Object(detail));
        } else {
            partial.insert(
                "msg",
                Value::String("widget failed; enable debug for details".to_string()),
            );
        }
        partial.status = WidgetStatus::Failed;
        partial
    }
}
