//! Batch router.
//!
//! Single entry point turning an ordered batch of widget requests into an
//! ordered batch of results. Each entry is resolved, invoked, and
//! fault-isolated independently: a failing widget routes through its own
//! `on_error` and never aborts the rest of the batch.

use std::sync::Arc;

use metrics::counter;
use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::widget::{CacheControl, WidgetRequest, WidgetResult};
use crate::registry::WidgetRegistry;
use crate::widget::{RequestContext, WidgetCall, WidgetOutput, WidgetRuntime};

/// Kwargs with this prefix are control keys for the router, never handler
/// arguments.
pub const RESERVED_PREFIX: &str = "__";
/// Control key forcing a cache refresh for one entry.
pub const FORCE_UPDATE_KEY: &str = "__force_update";

/// Aggregate outcome of one batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// One result per request, in input order.
    pub results: Vec<WidgetResult>,
    /// Widget-supplied cache-control override; the last widget in iteration
    /// order to set one wins.
    pub cache_control: Option<CacheControl>,
}

pub struct BatchRouter {
    registry: Arc<WidgetRegistry>,
    runtime: WidgetRuntime,
}

impl BatchRouter {
    pub fn new(registry: Arc<WidgetRegistry>, runtime: WidgetRuntime) -> Self {
        Self { registry, runtime }
    }

    pub fn runtime(&self) -> &WidgetRuntime {
        &self.runtime
    }

    /// Process a batch sequentially, in input order.
    pub async fn route(&self, ctx: &RequestContext, bulk: Vec<WidgetRequest>) -> BatchOutcome {
        let mut results = Vec::with_capacity(bulk.len());
        let mut cache_control = None;

        for entry in bulk {
            let (call, force_update) = prepare_call(entry.args, entry.kwargs);

            let Some(widget) = self.registry.resolve(&entry.widget_name) else {
                counter!("mosaico_widget_not_found_total").increment(1);
                warn!(widget = %entry.widget_name, id = %entry.id, "widget not found");
                results.push(WidgetResult::not_found(entry.id));
                continue;
            };

            match self
                .runtime
                .invoke(widget.as_ref(), ctx, &call, force_update)
                .await
            {
                Ok(WidgetOutput {
                    envelope,
                    cache_control: directive,
                }) => {
                    if let Some(directive) = directive {
                        cache_control = Some(directive);
                    }
                    counter!("mosaico_widget_succeeded_total").increment(1);
                    results.push(WidgetResult::succeeded(entry.id, envelope));
                }
                Err(error) => {
                    counter!("mosaico_widget_failed_total").increment(1);
                    warn!(
                        widget = %entry.widget_name,
                        id = %entry.id,
                        error = %error,
                        "widget invocation failed"
                    );
                    let partial = WidgetResult::failed(entry.id);
                    results.push(widget.on_error(
                        &error,
                        partial,
                        ctx,
                        &call,
                        self.runtime.debug(),
                    ));
                }
            }
        }

        BatchOutcome {
            results,
            cache_control,
        }
    }

    /// Invoke one named widget directly, outside a batch.
    ///
    /// `None` when the name is unregistered. Used by the single-widget debug
    /// endpoint; errors are not routed through `on_error` here.
    pub async fn invoke_single(
        &self,
        ctx: &RequestContext,
        name: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Option<Result<WidgetOutput, crate::domain::WidgetError>> {
        let widget = self.registry.resolve(name)?;
        let (call, force_update) = prepare_call(args, kwargs);
        Some(
            self.runtime
                .invoke(widget.as_ref(), ctx, &call, force_update)
                .await,
        )
    }
}

/// Interpret then strip reserved kwargs.
///
/// `__force_update` is read before stripping and accepts any truthy JSON
/// value; every `__`-prefixed key is removed so control keys never reach
/// handler code.
fn prepare_call(args: Vec<Value>, kwargs: Map<String, Value>) -> (WidgetCall, bool) {
    let force_update = kwargs.get(FORCE_UPDATE_KEY).is_some_and(is_truthy);

    let kwargs = kwargs
        .into_iter()
        .filter(|(key, _)| !key.starts_with(RESERVED_PREFIX))
        .collect();

    (WidgetCall { args, kwargs }, force_update)
}

/// JSON truthiness: null, `false`, zero, and empty strings, arrays, and
/// objects are falsy; everything else is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(entries) => !entries.is_empty(),
    }
}
