//! Wire types for the batch widget protocol.
//!
//! A client submits an ordered batch of [`WidgetRequest`]s and receives one
//! [`WidgetResult`] per request, in the same order, each carrying the fields
//! contributed by the resolved handler.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One element of an incoming batch.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WidgetRequest {
    pub id: String,
    pub widget_name: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

/// Terminal state of one batch entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WidgetStatus {
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "WidgetNotFound")]
    WidgetNotFound,
}

/// One element of the outgoing batch.
///
/// `fields` is flattened into the serialized object, so a successful result
/// reads as `{"id": ..., "status": "succeeded", "template": ..., "context": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetResult {
    pub id: String,
    pub status: WidgetStatus,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl WidgetResult {
    /// Result for a widget name absent from the registry.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: WidgetStatus::WidgetNotFound,
            fields: Map::new(),
        }
    }

    /// Seed result handed to `on_error` when an invocation fails.
    pub fn failed(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: WidgetStatus::Failed,
            fields: Map::new(),
        }
    }

    /// Successful result carrying the envelope's template and context.
    pub fn succeeded(id: impl Into<String>, envelope: Envelope) -> Self {
        let mut fields = Map::new();
        fields.insert("template".to_string(), Value::String(envelope.template));
        fields.insert("context".to_string(), Value::Object(envelope.context));
        Self {
            id: id.into(),
            status: WidgetStatus::Succeeded,
            fields,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }
}

/// Value for the batch response's `Cache-Control` header.
///
/// A widget attaches one to its envelope to supersede the default caching
/// policy for the entire batch response. This is an explicit typed directive,
/// never serialized into the result payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheControl(String);

impl CacheControl {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Directive for widgets whose output must never be cached downstream.
    pub fn no_cache() -> Self {
        Self("no-cache".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Response envelope exchanged between the cacheable and uncacheable phases.
///
/// `context` is always present, even when nothing is cacheable. The
/// `cache_control` directive rides along out-of-band: the invocation pipeline
/// extracts it before the envelope is merged into a [`WidgetResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub template: String,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(skip)]
    pub cache_control: Option<CacheControl>,
}

impl Envelope {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            context: Map::new(),
            cache_control: None,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.context.insert(key.into(), value);
    }

    pub fn with_cache_control(mut self, directive: CacheControl) -> Self {
        self.cache_control = Some(directive);
        self
    }
}
