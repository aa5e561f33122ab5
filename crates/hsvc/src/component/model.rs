// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Deployment model: named set of component threads with a load lifecycle.

use super::{ComponentEntry, ComponentThreadEntry, ComponentThreadList, RegistryEntry};
use crate::error::{Error, Result};

/// Load lifecycle of a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelState {
    /// Described, not yet instantiated.
    #[default]
    Initialized,
    /// Components instantiated.
    Loaded,
    /// Torn down. Terminal.
    Unloaded,
}

/// Top-level deployment descriptor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    name: String,
    threads: ComponentThreadList,
    state: ModelState,
    alive: bool,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == ModelState::Loaded
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn threads(&self) -> &ComponentThreadList {
        &self.threads
    }

    pub fn add_thread(&mut self, entry: ComponentThreadEntry) -> bool {
        self.threads.add(entry)
    }

    pub fn add_thread_or_get(&mut self, entry: ComponentThreadEntry) -> &mut ComponentThreadEntry {
        self.threads.add_or_get(entry)
    }

    pub fn remove_thread(&mut self, name: &str) -> bool {
        self.threads.remove(name)
    }

    pub fn find_thread(&self, name: &str) -> Option<&ComponentThreadEntry> {
        self.threads.find(name)
    }

    pub fn find_thread_mut(&mut self, name: &str) -> Option<&mut ComponentThreadEntry> {
        self.threads.find_mut(name)
    }

    /// True if any thread hosts a component with `role`.
    pub fn has_registered_component(&self, role: &str) -> bool {
        self.find_component(role).is_some()
    }

    /// Component with `role`, searching every thread.
    pub fn find_component(&self, role: &str) -> Option<&ComponentEntry> {
        self.threads.iter().find_map(|t| t.find_component(role))
    }

    /// Iterate every component of every thread.
    pub fn components(&self) -> impl Iterator<Item = &ComponentEntry> {
        self.threads.iter().flat_map(|t| t.components().iter())
    }

    /// First role declared more than once across threads.
    pub fn duplicate_role(&self) -> Option<&str> {
        let mut seen = std::collections::HashSet::new();
        self.components()
            .map(ComponentEntry::role)
            .find(|role| !seen.insert(*role))
    }

    /// Named, at least one thread, every thread valid, roles unique.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && self.threads.is_valid() && self.duplicate_role().is_none()
    }

    /// `true`: `Initialized -> Loaded`. `false`: `Loaded -> Unloaded`.
    pub fn mark_model_loaded(&mut self, loaded: bool) -> Result<()> {
        self.state = match (self.state, loaded) {
            (ModelState::Initialized, true) => ModelState::Loaded,
            (ModelState::Loaded, false) => {
                self.alive = false;
                ModelState::Unloaded
            }
            (state, _) => {
                return Err(Error::ModelState(format!(
                    "model '{}' cannot go from {:?} to {}",
                    self.name,
                    state,
                    if loaded { "loaded" } else { "unloaded" }
                )))
            }
        };
        Ok(())
    }

    /// Toggle the alive bracket. Only allowed while loaded.
    pub fn mark_model_alive(&mut self, alive: bool) -> Result<()> {
        if self.state != ModelState::Loaded {
            return Err(Error::ModelState(format!(
                "model '{}' is {:?}, alive flag requires Loaded",
                self.name, self.state
            )));
        }
        self.alive = alive;
        Ok(())
    }
}

impl RegistryEntry for Model {
    fn key(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        Model::is_valid(self)
    }
}
