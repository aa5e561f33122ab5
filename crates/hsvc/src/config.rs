// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! hsvc configuration: compile-time constants and runtime settings.
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: constants for path rendering, name bounds and
//!   dispatcher defaults. **Never hardcode them elsewhere.**
//! - **Level 2 (Dynamic)**: [`RuntimeConfig`], shared by every dispatcher
//!   spawned by a [`crate::runtime::ModelRuntime`].
//!
//! # Performance
//!
//! - `ArcSwap` for the dispatcher settings (atomic load, no lock)
//! - `DashMap` for the property store (sharded, no global lock)

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

// =======================================================================
// Addressing
// =======================================================================

/// Field separator used in service and address path strings.
///
/// `Echo::1.0.0::1::Svc::T` = service item, role, thread.
pub const PATH_SEPARATOR: &str = "::";

/// Maximum length (bytes) of a service name.
pub const SERVICE_NAME_MAX_LEN: usize = 128;

/// Reserved service name marking an invalid item.
pub const INVALID_SERVICE_NAME: &str = "invalid";

// =======================================================================
// Dispatcher defaults
// =======================================================================

/// Idle tick of dispatcher threads that carry a watchdog (milliseconds).
///
/// When the inbox stays empty this long, the thread refreshes its heartbeat
/// so an external watchdog does not flag an idle thread as stalled.
pub const DISPATCHER_IDLE_TICK_MS: u64 = 500;

/// Watchdog timeout meaning "no watchdog".
pub const WATCHDOG_DISABLED_MS: u64 = 0;

/// Prefix given to worker thread OS names.
pub const WORKER_THREAD_PREFIX: &str = "hsvc-worker";

/// Dispatcher thread settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Wait slice used by watchdog-bearing threads. `None` = block forever.
    pub idle_tick: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            idle_tick: Some(Duration::from_millis(DISPATCHER_IDLE_TICK_MS)),
        }
    }
}

/// Convert a watchdog value in milliseconds to an optional duration.
#[inline]
#[must_use]
pub fn watchdog_from_ms(ms: u64) -> Option<Duration> {
    if ms == WATCHDOG_DISABLED_MS {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}

/// Runtime configuration shared between the model runtime and its threads.
///
/// Cloning is cheap: both stores are behind `Arc`.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Current dispatcher settings (atomic swap).
    dispatcher: Arc<ArcSwap<DispatcherConfig>>,

    /// Free-form properties (e.g. from the `properties` map of a YAML model).
    properties: Arc<DashMap<Arc<str>, Arc<str>>>,
}

impl RuntimeConfig {
    /// Create a config with default dispatcher settings and no properties.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dispatcher: Arc::new(ArcSwap::new(Arc::new(DispatcherConfig::default()))),
            properties: Arc::new(DashMap::new()),
        }
    }

    /// Replace the dispatcher settings. Affects threads spawned afterwards.
    #[inline]
    pub fn set_dispatcher(&self, config: DispatcherConfig) {
        self.dispatcher.store(Arc::new(config));
    }

    /// Current dispatcher settings.
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> DispatcherConfig {
        **self.dispatcher.load()
    }

    /// Set a property, returning the previous value.
    pub fn set_property(&self, key: &str, value: &str) -> Option<Arc<str>> {
        self.properties.insert(Arc::from(key), Arc::from(value))
    }

    /// Get a property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<Arc<str>> {
        self.properties.get(key).map(|v| Arc::clone(v.value()))
    }

    /// Remove a property.
    pub fn remove_property(&self, key: &str) -> Option<Arc<str>> {
        self.properties.remove(key).map(|(_, v)| v)
    }

    /// All properties whose key starts with `prefix`, sorted by key.
    #[must_use]
    pub fn search_prefix(&self, prefix: &str) -> Vec<(Arc<str>, Arc<str>)> {
        let mut found: Vec<_> = self
            .properties
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| (Arc::clone(e.key()), Arc::clone(e.value())))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found
    }

    /// Number of stored properties.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("dispatcher", &self.dispatcher())
            .field("properties", &self.properties.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watchdog_zero_is_disabled() {
        assert_eq!(watchdog_from_ms(0), None);
        assert_eq!(watchdog_from_ms(250), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_dispatcher_swap_is_visible_to_clones() {
        let config = RuntimeConfig::new();
        let clone = config.clone();
        config.set_dispatcher(DispatcherConfig { idle_tick: None });
        assert_eq!(clone.dispatcher().idle_tick, None);
    }

    #[test]
    fn test_property_prefix_search() {
        let config = RuntimeConfig::new();
        config.set_property("trace.level", "debug");
        config.set_property("trace.file", "out.log");
        config.set_property("model.name", "M");

        let found = config.search_prefix("trace.");
        assert_eq!(found.len(), 2);
        assert_eq!(&*found[0].0, "trace.file");
        assert_eq!(config.property("model.name").as_deref(), Some("M"));
        assert!(config.remove_property("model.name").is_some());
        assert_eq!(config.property_count(), 2);
    }
}
