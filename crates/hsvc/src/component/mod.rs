// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Component registry.
//!
//! Passive description of a deployment: which roles run in which dispatcher
//! threads, which services they implement, which roles they depend on and
//! which worker threads they own.
//!
//! ```text
//! Model "M"  (Initialized -> Loaded -> Unloaded, alive flag while Loaded)
//! +-- ComponentThreadEntry "T" (watchdog)
//!     +-- ComponentEntry "Svc" (factory, user data)
//!         +-- ServiceEntry "Echo" 1.0.0
//!         +-- DependencyEntry "Clock"
//!         +-- WorkerThreadEntry "T::Io"
//! ```
//!
//! The registry stores [`ComponentFactory`] bindings but never calls them;
//! [`crate::runtime::ModelRuntime`] does.

mod entry;
mod factory;
mod list;
#[cfg(feature = "model-loaders")]
pub mod loader;
mod model;

pub use entry::{
    ComponentEntry, ComponentList, ComponentThreadEntry, ComponentThreadList, DependencyEntry,
    DependencyList, ServiceEntry, ServiceList, UserData, WorkerThreadEntry, WorkerThreadList,
};
pub use factory::{Component, ComponentFactory, CreateFn, DestroyFn};
pub use list::{EntryList, RegistryEntry};
#[cfg(feature = "model-loaders")]
pub use loader::{FactoryCatalog, LoadedModel, YamlModelLoader};
pub use model::{Model, ModelState};
