// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML model loader.
//!
//! Builds a [`Model`] from a human-friendly document. Factory names are
//! resolved through a [`FactoryCatalog`] filled by the application.
//!
//! # Example YAML
//!
//! ```yaml
//! model: M
//! properties:
//!   trace.level: debug
//! threads:
//!   - name: T
//!     watchdog_ms: 500
//!     components:
//!       - role: Svc
//!         factory: echo
//!         services:
//!           - name: Echo
//!             version: 1.0.0
//!         dependencies: [Clock]
//!         workers:
//!           - name: Io
//!             consumer: EchoIo
//! ```

use super::{
    ComponentEntry, ComponentFactory, ComponentThreadEntry, DependencyEntry, Model, ServiceEntry,
};
use crate::config::{watchdog_from_ms, RuntimeConfig};
use crate::error::{Error, Result};
use crate::service::Version;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Root YAML document.
#[derive(Debug, Deserialize)]
pub struct YamlModelDocument {
    /// Model name.
    pub model: String,

    /// Free-form properties merged into the runtime config.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Dispatcher threads.
    #[serde(default)]
    pub threads: Vec<YamlThread>,
}

/// One dispatcher thread.
#[derive(Debug, Deserialize)]
pub struct YamlThread {
    pub name: String,

    /// Watchdog timeout, 0 or absent = none.
    #[serde(default)]
    pub watchdog_ms: u64,

    #[serde(default)]
    pub components: Vec<YamlComponent>,
}

/// One component.
#[derive(Debug, Deserialize)]
pub struct YamlComponent {
    pub role: String,

    /// Name looked up in the [`FactoryCatalog`].
    pub factory: String,

    #[serde(default)]
    pub services: Vec<YamlService>,

    /// Roles required before startup.
    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub workers: Vec<YamlWorker>,
}

/// Supported service.
#[derive(Debug, Deserialize)]
pub struct YamlService {
    pub name: String,
    /// `major.minor.patch`
    pub version: String,
}

/// Worker thread.
#[derive(Debug, Deserialize)]
pub struct YamlWorker {
    pub name: String,
    pub consumer: String,
    #[serde(default)]
    pub watchdog_ms: u64,
}

/// Factory bindings addressable by name from a model document.
#[derive(Debug, Clone, Default)]
pub struct FactoryCatalog {
    factories: HashMap<String, ComponentFactory>,
}

impl FactoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous binding.
    pub fn register(&mut self, name: impl Into<String>, factory: ComponentFactory) -> &mut Self {
        self.factories.insert(name.into(), factory);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ComponentFactory> {
        self.factories.get(name)
    }
}

/// Loaded model plus its properties.
#[derive(Debug)]
pub struct LoadedModel {
    pub model: Model,
    pub properties: BTreeMap<String, String>,
}

impl LoadedModel {
    /// Merge the document properties into `config`.
    pub fn apply_properties(&self, config: &RuntimeConfig) {
        for (key, value) in &self.properties {
            config.set_property(key, value);
        }
    }
}

/// YAML model loader.
pub struct YamlModelLoader;

impl YamlModelLoader {
    /// Load a model from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P, catalog: &FactoryCatalog) -> Result<LoadedModel> {
        let path = path.as_ref();
        let yaml_content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read model file {}: {}", path.display(), e))
        })?;
        Self::load_from_str(&yaml_content, catalog)
    }

    /// Load a model from YAML text.
    pub fn load_from_str(yaml_content: &str, catalog: &FactoryCatalog) -> Result<LoadedModel> {
        let doc = Self::parse_yaml(yaml_content)?;
        let model = Self::document_to_model(&doc, catalog)?;
        log::debug!(
            "[model-loader] model '{}' parsed: {} thread(s)",
            model.name(),
            model.threads().len()
        );
        Ok(LoadedModel {
            model,
            properties: doc.properties,
        })
    }

    /// Parse YAML content.
    pub fn parse_yaml(yaml_content: &str) -> Result<YamlModelDocument> {
        serde_yaml::from_str(yaml_content)
            .map_err(|e| Error::Config(format!("Failed to parse YAML: {}", e)))
    }

    /// Convert a parsed document into a validated model.
    pub fn document_to_model(doc: &YamlModelDocument, catalog: &FactoryCatalog) -> Result<Model> {
        let mut model = Model::new(doc.model.as_str());

        for thread in &doc.threads {
            let mut entry = ComponentThreadEntry::new(thread.name.as_str(), watchdog_from_ms(thread.watchdog_ms));

            for component in &thread.components {
                let factory = catalog.get(&component.factory).ok_or_else(|| {
                    Error::InvalidModel(format!(
                        "component '{}': unknown factory '{}'",
                        component.role, component.factory
                    ))
                })?;
                let mut comp = ComponentEntry::new(thread.name.as_str(), component.role.as_str(), factory.clone());

                for service in &component.services {
                    let version: Version = service.version.parse()?;
                    comp.add_supported_service(ServiceEntry::new(service.name.as_str(), version));
                }
                for role in &component.dependencies {
                    comp.add_dependency(DependencyEntry::new(role.as_str()));
                }
                for worker in &component.workers {
                    comp.add_worker_thread(&worker.name, &worker.consumer, watchdog_from_ms(worker.watchdog_ms));
                }

                if !entry.add_component(comp) {
                    return Err(Error::DuplicateRole(component.role.clone()));
                }
            }

            if !model.add_thread(entry) {
                return Err(Error::InvalidModel(format!(
                    "thread '{}' declared twice",
                    thread.name
                )));
            }
        }

        if let Some(role) = model.duplicate_role() {
            return Err(Error::DuplicateRole(role.to_string()));
        }
        if !model.is_valid() {
            return Err(Error::InvalidModel(format!(
                "model '{}' needs a name and at least one thread with components",
                doc.model
            )));
        }
        Ok(model)
    }
}
