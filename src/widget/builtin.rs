//! Built-in widgets shipped with the server binary.
//!
//! The configuration maps widget names to catalog ids; [`catalog`] is the
//! startup registration table consulted when the registry is populated.
//! Library users register their own handlers directly on the registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::cache::{CacheKey, hash_call};
use crate::domain::error::WidgetError;
use crate::domain::widget::{CacheControl, Envelope};
use crate::registry::WidgetFactory;

use super::{RequestContext, Widget, WidgetCall};

/// Factory table for configuration-driven registration.
pub fn catalog() -> HashMap<&'static str, WidgetFactory> {
    let mut table: HashMap<&'static str, WidgetFactory> = HashMap::new();
    table.insert("clock", Arc::new(|| Arc::new(ClockWidget) as Arc<dyn Widget>));
    table.insert("echo", Arc::new(|| Arc::new(EchoWidget) as Arc<dyn Widget>));
    table
}

/// Current server time, recomputed per request and never cached anywhere:
/// the widget overrides the batch response's cache-control policy.
pub struct ClockWidget;

#[async_trait]
impl Widget for ClockWidget {
    fn template(&self) -> &str {
        "<time datetime=\"{{ now }}\">{{ now }}</time>"
    }

    fn use_cache(&self) -> bool {
        false
    }

    async fn uncacheable(
        &self,
        _ctx: &RequestContext,
        mut envelope: Envelope,
        _call: &WidgetCall,
    ) -> Result<Envelope, WidgetError> {
        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|err| WidgetError::internal(format!("failed to format timestamp: {err}")))?;
        envelope.insert("now", json!(now));
        Ok(envelope.with_cache_control(CacheControl::no_cache()))
    }
}

/// Echoes its call arguments back into the context. The cacheable phase is
/// keyed on the full argument set, so identical calls share one envelope.
pub struct EchoWidget;

#[async_trait]
impl Widget for EchoWidget {
    fn template(&self) -> &str {
        "<pre>{{ args }} {{ kwargs }}</pre>"
    }

    fn cache_key(&self, call: &WidgetCall) -> Option<CacheKey> {
        Some(hash_call("echo", call))
    }

    async fn cacheable(
        &self,
        mut envelope: Envelope,
        call: &WidgetCall,
    ) -> Result<Envelope, WidgetError> {
        envelope.insert("args", Value::Array(call.args.clone()));
        envelope.insert("kwargs", Value::Object(call.kwargs.clone()));
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn clock_sets_timestamp_and_directive() {
        let widget = ClockWidget;
        let envelope = widget
            .uncacheable(
                &RequestContext::default(),
                widget.default_response(&WidgetCall::default()),
                &WidgetCall::default(),
            )
            .await
            .expect("clock widget");

        assert!(envelope.context["now"].as_str().is_some());
        assert_eq!(envelope.cache_control, Some(CacheControl::no_cache()));
    }

    #[tokio::test]
    async fn echo_reflects_arguments() {
        let widget = EchoWidget;
        let mut call = WidgetCall::default();
        call.args.push(json!(1));
        call.kwargs.insert("name".to_string(), json!("mosaico"));

        let envelope = widget
            .cacheable(widget.default_response(&call), &call)
            .await
            .expect("echo widget");

        assert_eq!(envelope.context["args"], json!([1]));
        assert_eq!(envelope.context["kwargs"]["name"], json!("mosaico"));
        assert!(widget.cache_key(&call).is_some());
    }

    #[test]
    fn catalog_contains_shipped_widgets() {
        let table = catalog();
        assert!(table.contains_key("clock"));
        assert!(table.contains_key("echo"));
    }
}
