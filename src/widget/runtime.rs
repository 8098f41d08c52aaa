//! Widget invocation pipeline.
//!
//! [`WidgetRuntime`] owns the shared envelope store and drives the
//! cache-read path (`get_cache` / `update_cache`) and the full two-phase
//! invocation (`invoke`) for any [`Widget`].

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::debug;

use crate::cache::EnvelopeStore;
use crate::domain::error::WidgetError;
use crate::domain::widget::{CacheControl, Envelope};

use super::{RequestContext, Widget, WidgetCall};

/// Outcome of one widget invocation: the merged envelope plus the widget's
/// optional cache-control directive for the batch response.
#[derive(Debug)]
pub struct WidgetOutput {
    pub envelope: Envelope,
    pub cache_control: Option<CacheControl>,
}

/// Shared invocation runtime.
#[derive(Clone)]
pub struct WidgetRuntime {
    store: Arc<dyn EnvelopeStore>,
    ttl: Duration,
    debug: bool,
}

impl WidgetRuntime {
    pub fn new(store: Arc<dyn EnvelopeStore>, ttl: Duration, debug: bool) -> Self {
        Self { store, ttl, debug }
    }

    /// Whether failed invocations carry detailed diagnostics.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Cache-read path for the shareable phase.
    ///
    /// On a sentinel key, a forced refresh, or a store miss the envelope is
    /// recomputed via `default_response` then `cacheable`, and stored unless
    /// the key is the sentinel. Concurrent misses on the same key may both
    /// recompute; the last write wins, which is sound because `cacheable`
    /// must be idempotent.
    pub async fn get_cache(
        &self,
        widget: &dyn Widget,
        call: &WidgetCall,
        force_update: bool,
    ) -> Result<Envelope, WidgetError> {
        let key = widget.cache_key(call);

        match key.as_ref() {
            None => {
                counter!("mosaico_widget_cache_skip_total").increment(1);
            }
            Some(key) if !force_update => {
                if let Some(envelope) = self.store.get(key) {
                    counter!("mosaico_widget_cache_hit_total").increment(1);
                    debug!(cache_key = %key, outcome = "hit", "serving cached envelope");
                    return Ok(envelope);
                }
                counter!("mosaico_widget_cache_miss_total").increment(1);
                debug!(cache_key = %key, outcome = "miss", "computing cacheable phase");
            }
            Some(key) => {
                counter!("mosaico_widget_cache_refresh_total").increment(1);
                debug!(cache_key = %key, outcome = "forced", "refreshing cached envelope");
            }
        }

        let envelope = widget.cacheable(widget.default_response(call), call).await?;
        if let Some(key) = key {
            self.store.set(key, envelope.clone(), self.ttl);
        }
        Ok(envelope)
    }

    /// Force a recomputation and overwrite of the stored envelope.
    pub async fn update_cache(
        &self,
        widget: &dyn Widget,
        call: &WidgetCall,
    ) -> Result<Envelope, WidgetError> {
        self.get_cache(widget, call, true).await
    }

    /// Full two-phase invocation.
    ///
    /// A widget with caching disabled starts from a fresh default envelope
    /// without touching the store or the cacheable phase. Each invocation
    /// runs the handler exactly once per phase.
    pub async fn invoke(
        &self,
        widget: &dyn Widget,
        ctx: &RequestContext,
        call: &WidgetCall,
        force_update: bool,
    ) -> Result<WidgetOutput, WidgetError> {
        let envelope = if widget.use_cache() {
            self.get_cache(widget, call, force_update).await?
        } else {
            widget.default_response(call)
        };

        let mut envelope = widget.uncacheable(ctx, envelope, call).await?;
        let cache_control = envelope.cache_control.take();

        Ok(WidgetOutput {
            envelope,
            cache_control,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use crate::cache::{CacheConfig, CacheKey, MemoryStore, hash_call};

    use super::*;

    #[derive(Default)]
    struct CountingWidget {
        cacheable_calls: AtomicUsize,
        uncacheable_calls: AtomicUsize,
        cached: bool,
    }

    impl CountingWidget {
        fn cached() -> Self {
            Self {
                cached: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Widget for CountingWidget {
        fn template(&self) -> &str {
            "<div>{{ n }}</div>"
        }

        fn cache_key(&self, call: &WidgetCall) -> Option<CacheKey> {
            self.cached.then(|| hash_call("counting", call))
        }

        async fn cacheable(
            &self,
            mut envelope: Envelope,
            _call: &WidgetCall,
        ) -> Result<Envelope, WidgetError> {
            let n = self.cacheable_calls.fetch_add(1, Ordering::SeqCst) + 1;
            envelope.insert("n", json!(n));
            Ok(envelope)
        }

        async fn uncacheable(
            &self,
            _ctx: &RequestContext,
            mut envelope: Envelope,
            _call: &WidgetCall,
        ) -> Result<Envelope, WidgetError> {
            self.uncacheable_calls.fetch_add(1, Ordering::SeqCst);
            envelope.insert("personal", json!(true));
            Ok(envelope)
        }
    }

    /// Store wrapper recording every write, for sentinel-key assertions.
    struct RecordingStore {
        inner: MemoryStore,
        writes: Mutex<Vec<CacheKey>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(&CacheConfig::default()),
                writes: Mutex::new(Vec::new()),
            }
        }
    }

    impl EnvelopeStore for RecordingStore {
        fn get(&self, key: &CacheKey) -> Option<Envelope> {
            self.inner.get(key)
        }

        fn set(&self, key: CacheKey, envelope: Envelope, ttl: Duration) {
            self.writes
                .lock()
                .expect("writes lock should not be poisoned")
                .push(key.clone());
            self.inner.set(key, envelope, ttl);
        }

        fn invalidate(&self, key: &CacheKey) {
            self.inner.invalidate(key);
        }
    }

    fn runtime_with(store: Arc<dyn EnvelopeStore>) -> WidgetRuntime {
        WidgetRuntime::new(store, Duration::from_secs(60), false)
    }

    #[tokio::test]
    async fn cache_hit_skips_cacheable_phase() {
        let runtime = runtime_with(Arc::new(MemoryStore::new(&CacheConfig::default())));
        let widget = CountingWidget::cached();
        let call = WidgetCall::default();

        let first = runtime
            .get_cache(&widget, &call, false)
            .await
            .expect("first read");
        let second = runtime
            .get_cache(&widget, &call, false)
            .await
            .expect("second read");

        assert_eq!(first, second);
        assert_eq!(widget.cacheable_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn forced_refresh_always_recomputes() {
        let runtime = runtime_with(Arc::new(MemoryStore::new(&CacheConfig::default())));
        let widget = CountingWidget::cached();
        let call = WidgetCall::default();

        runtime
            .get_cache(&widget, &call, false)
            .await
            .expect("seed the cache");
        let refreshed = runtime
            .update_cache(&widget, &call)
            .await
            .expect("forced refresh");

        assert_eq!(refreshed.context["n"], json!(2));
        assert_eq!(widget.cacheable_calls.load(Ordering::SeqCst), 2);

        // The overwrite is visible to subsequent reads.
        let cached = runtime
            .get_cache(&widget, &call, false)
            .await
            .expect("read after refresh");
        assert_eq!(cached.context["n"], json!(2));
    }

    #[tokio::test]
    async fn sentinel_key_never_writes_to_the_store() {
        let store = Arc::new(RecordingStore::new());
        let runtime = runtime_with(store.clone());
        let widget = CountingWidget::default();
        let call = WidgetCall::default();

        runtime
            .get_cache(&widget, &call, false)
            .await
            .expect("uncached read");
        runtime
            .update_cache(&widget, &call)
            .await
            .expect("forced refresh still respects the sentinel");

        assert!(
            store
                .writes
                .lock()
                .expect("writes lock should not be poisoned")
                .is_empty()
        );
        assert_eq!(widget.cacheable_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invoke_runs_uncacheable_on_every_call() {
        let runtime = runtime_with(Arc::new(MemoryStore::new(&CacheConfig::default())));
        let widget = CountingWidget::cached();
        let ctx = RequestContext::default();
        let call = WidgetCall::default();

        for _ in 0..3 {
            let output = runtime
                .invoke(&widget, &ctx, &call, false)
                .await
                .expect("invocation");
            assert_eq!(output.envelope.context["personal"], json!(true));
        }

        assert_eq!(widget.cacheable_calls.load(Ordering::SeqCst), 1);
        assert_eq!(widget.uncacheable_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn invoke_extracts_cache_control_directive() {
        struct NoStoreWidget;

        #[async_trait]
        impl Widget for NoStoreWidget {
            fn use_cache(&self) -> bool {
                false
            }

            async fn uncacheable(
                &self,
                _ctx: &RequestContext,
                envelope: Envelope,
                _call: &WidgetCall,
            ) -> Result<Envelope, WidgetError> {
                Ok(envelope.with_cache_control(CacheControl::no_cache()))
            }
        }

        let runtime = runtime_with(Arc::new(MemoryStore::new(&CacheConfig::default())));
        let output = runtime
            .invoke(
                &NoStoreWidget,
                &RequestContext::default(),
                &WidgetCall::default(),
                false,
            )
            .await
            .expect("invocation");

        assert_eq!(output.cache_control, Some(CacheControl::no_cache()));
        assert!(output.envelope.cache_control.is_none());
    }
}
