//! Adapter bookkeeping.

use std::sync::Arc;

use parking_lot::RwLock;
use switchboard_core::BoxedAdapter;
use tracing::{debug, warn};

/// Holds the registered adapters, in registration order.
///
/// Adapters registered after the engine started still receive responses,
/// but their ingestion loop is not started.
#[derive(Default)]
pub struct AdapterManager {
    adapters: RwLock<Vec<BoxedAdapter>>,
}

impl AdapterManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter`.
    ///
    /// Names are used for logging only, so duplicates are allowed but warned
    /// about.
    pub fn register(&self, adapter: BoxedAdapter) {
        let mut adapters = self.adapters.write();
        if adapters.iter().any(|a| a.name() == adapter.name()) {
            warn!(adapter = %adapter.name(), "Another adapter with this name is already registered");
        }
        debug!(adapter = %adapter.name(), "Registered adapter");
        adapters.push(adapter);
    }

    /// Snapshot of the registered adapters.
    ///
    /// The lock is released before returning, so callers may await on the
    /// adapters freely.
    pub fn all(&self) -> Vec<BoxedAdapter> {
        self.adapters.read().iter().map(Arc::clone).collect()
    }

    pub fn adapter_names(&self) -> Vec<String> {
        self.adapters
            .read()
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.read().is_empty()
    }
}

impl std::fmt::Debug for AdapterManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterManager")
            .field("adapters", &self.adapter_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingAdapter;

    #[test]
    fn test_register_keeps_order() {
        let manager = AdapterManager::new();
        assert!(manager.is_empty());

        manager.register(Arc::new(RecordingAdapter::new("console")));
        manager.register(Arc::new(RecordingAdapter::new("slack")));

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.adapter_names(), ["console", "slack"]);
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let manager = AdapterManager::new();
        manager.register(Arc::new(RecordingAdapter::new("console")));
        manager.register(Arc::new(RecordingAdapter::new("console")));

        assert_eq!(manager.all().len(), 2);
    }
}
