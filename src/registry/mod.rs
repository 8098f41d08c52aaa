//! Widget handler registry.
//!
//! Maps widget names to handlers. Entries start as factories registered at
//! startup and are swapped for live instances on first resolution (lazy
//! singleton per process). Two requests racing on the same first resolution
//! may both construct; construction must be side-effect-free, and the last
//! write wins — equivalent instances make the race harmless.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::widget::Widget;

/// Builds a handler instance. Must be idempotent and free of side effects.
pub type WidgetFactory = Arc<dyn Fn() -> Arc<dyn Widget> + Send + Sync>;

enum RegistryEntry {
    Pending(WidgetFactory),
    Ready(Arc<dyn Widget>),
}

/// Shared name → handler mapping.
///
/// Populated once at startup; mutated afterwards only by the lazy
/// factory-to-instance swap in [`WidgetRegistry::resolve`].
#[derive(Default)]
pub struct WidgetRegistry {
    entries: DashMap<String, RegistryEntry>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory built lazily on first use.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Widget> + Send + Sync + 'static,
    {
        self.entries
            .insert(name.into(), RegistryEntry::Pending(Arc::new(factory)));
    }

    /// Register an already-built handler instance.
    pub fn register_instance(&self, name: impl Into<String>, widget: Arc<dyn Widget>) {
        self.entries.insert(name.into(), RegistryEntry::Ready(widget));
    }

    /// Look up a handler, building and memoizing it on first use.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Widget>> {
        // Drop the map guard before running the factory: handler
        // construction is opaque and must not block other lookups.
        let factory = match self.entries.get(name)?.value() {
            RegistryEntry::Ready(widget) => return Some(Arc::clone(widget)),
            RegistryEntry::Pending(factory) => Arc::clone(factory),
        };

        let widget = factory();
        debug!(widget = name, "constructed widget handler");
        self.entries
            .insert(name.to_string(), RegistryEntry::Ready(Arc::clone(&widget)));
        Some(widget)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::widget::WidgetCall;

    struct Probe;

    impl Widget for Probe {
        fn template(&self) -> &str {
            "<p>probe</p>"
        }
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        let registry = WidgetRegistry::new();
        assert!(registry.resolve("missing").is_none());
    }

    #[test]
    fn factory_runs_once_on_repeated_resolution() {
        let registry = WidgetRegistry::new();
        let constructions = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&constructions);
        registry.register("probe", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(Probe)
        });

        let first = registry.resolve("probe").expect("registered widget");
        let second = registry.resolve("probe").expect("registered widget");

        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        assert_eq!(
            first.default_response(&WidgetCall::default()).template,
            "<p>probe</p>"
        );
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn instance_registration_skips_the_factory_path() {
        let registry = WidgetRegistry::new();
        registry.register_instance("probe", Arc::new(Probe));

        assert!(registry.contains("probe"));
        assert!(registry.resolve("probe").is_some());
        assert_eq!(registry.len(), 1);
    }
}
