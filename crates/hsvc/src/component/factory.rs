// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Component lifecycle bindings.

use super::{ComponentEntry, WorkerThreadEntry};
use crate::error::Result;
use crate::runtime::{ThreadContext, WorkerConsumer};
use std::fmt;
use std::sync::Arc;

/// Runnable unit instantiated from a [`ComponentEntry`] on its dispatcher
/// thread.
///
/// A component typically registers stubs and attaches proxies in
/// [`startup`](Component::startup).
pub trait Component {
    fn startup(&mut self, ctx: &mut ThreadContext) -> Result<()>;

    fn shutdown(&mut self, _ctx: &mut ThreadContext) {}

    /// Consumer for one of the component's declared worker threads.
    ///
    /// Returning `None` leaves that worker thread unstarted.
    fn worker_consumer(&mut self, _worker: &WorkerThreadEntry) -> Option<Box<dyn WorkerConsumer>> {
        None
    }
}

/// Create closure.
pub type CreateFn = dyn Fn(&ComponentEntry) -> Result<Box<dyn Component>> + Send + Sync;

/// Destroy closure.
pub type DestroyFn = dyn Fn(Box<dyn Component>, &ComponentEntry) + Send + Sync;

/// Create/destroy binding stored by value in a [`ComponentEntry`].
///
/// The registry never calls it; the runtime does, on the owning thread.
#[derive(Clone)]
pub struct ComponentFactory {
    create: Arc<CreateFn>,
    destroy: Arc<DestroyFn>,
}

impl ComponentFactory {
    pub fn new<C, D>(create: C, destroy: D) -> Self
    where
        C: Fn(&ComponentEntry) -> Result<Box<dyn Component>> + Send + Sync + 'static,
        D: Fn(Box<dyn Component>, &ComponentEntry) + Send + Sync + 'static,
    {
        Self {
            create: Arc::new(create),
            destroy: Arc::new(destroy),
        }
    }

    /// Binding whose destroy step simply drops the component.
    pub fn from_fn<C>(create: C) -> Self
    where
        C: Fn(&ComponentEntry) -> Result<Box<dyn Component>> + Send + Sync + 'static,
    {
        Self::new(create, |component, _| drop(component))
    }

    pub fn create(&self, entry: &ComponentEntry) -> Result<Box<dyn Component>> {
        (self.create)(entry)
    }

    pub fn destroy(&self, component: Box<dyn Component>, entry: &ComponentEntry) {
        (self.destroy)(component, entry)
    }
}

impl PartialEq for ComponentFactory {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.create, &other.create) && Arc::ptr_eq(&self.destroy, &other.destroy)
    }
}

impl fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ComponentFactory")
    }
}
