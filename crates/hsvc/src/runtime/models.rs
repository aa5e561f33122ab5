// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Model lifecycle: turn a registry [`Model`] into running threads.

use super::context::ThreadContext;
use super::dispatcher::{DispatcherThread, Heartbeat};
use super::router::ServiceRouter;
use crate::component::{Model, ModelState};
use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

struct ActiveModel {
    model: Model,
    threads: Vec<DispatcherThread>,
}

/// Name and roles of a model whose threads are starting.
struct Reservation {
    name: String,
    roles: Vec<String>,
}

/// Loads and unloads [`Model`]s on a shared [`ServiceRouter`].
///
/// Roles are unique across every loaded model. Dropping the runtime unloads
/// everything.
pub struct ModelRuntime {
    router: Arc<ServiceRouter>,
    config: RuntimeConfig,
    models: Mutex<Vec<ActiveModel>>,
    /// Locked after `models` when both are held.
    starting: Mutex<Vec<Reservation>>,
}

impl ModelRuntime {
    pub fn new(router: Arc<ServiceRouter>, config: RuntimeConfig) -> Self {
        Self {
            router,
            config,
            models: Mutex::new(Vec::new()),
            starting: Mutex::new(Vec::new()),
        }
    }

    pub fn router(&self) -> &Arc<ServiceRouter> {
        &self.router
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Spawn the threads of `model` and start its components.
    ///
    /// Each component is created and started on its own thread; this call
    /// returns once all of them have started. If one fails, everything
    /// started so far is torn down and the model is not loaded.
    pub fn load_model(&self, mut model: Model) -> Result<()> {
        if model.state() != ModelState::Initialized {
            return Err(Error::ModelState(format!(
                "model '{}' is {:?}, expected Initialized",
                model.name(),
                model.state()
            )));
        }
        if let Some(role) = model.duplicate_role() {
            return Err(Error::DuplicateRole(role.to_string()));
        }
        if !model.is_valid() {
            return Err(Error::InvalidModel(model.name().to_string()));
        }

        self.reserve(&model)?;
        let threads = match self.start_threads(&model) {
            Ok(threads) => threads,
            Err(e) => {
                self.release(model.name());
                return Err(e);
            }
        };
        let marked = model
            .mark_model_loaded(true)
            .and_then(|()| model.mark_model_alive(true));
        if let Err(e) = marked {
            stop_all(threads);
            self.release(model.name());
            return Err(e);
        }

        log::info!("[runtime] model '{}' loaded ({} thread(s))", model.name(), threads.len());
        let mut models = self.models.lock();
        self.release(model.name());
        models.push(ActiveModel { model, threads });
        Ok(())
    }

    /// Claim the name and roles of `model` while its threads start, so the
    /// model lock is not held across component startup.
    fn reserve(&self, model: &Model) -> Result<()> {
        let models = self.models.lock();
        let mut starting = self.starting.lock();
        let name_taken = models.iter().any(|m| m.model.name() == model.name())
            || starting.iter().any(|r| r.name == model.name());
        if name_taken {
            return Err(Error::InvalidModel(format!("model '{}' already loaded", model.name())));
        }
        for component in model.components() {
            let role = component.role();
            let taken = models.iter().any(|m| m.model.has_registered_component(role))
                || starting.iter().any(|r| r.roles.iter().any(|claimed| claimed == role))
                || self.router.find_stub(role).is_some();
            if taken {
                return Err(Error::DuplicateRole(role.to_string()));
            }
        }
        starting.push(Reservation {
            name: model.name().to_string(),
            roles: model.components().map(|c| c.role().to_string()).collect(),
        });
        Ok(())
    }

    fn release(&self, name: &str) {
        self.starting.lock().retain(|r| r.name != name);
    }

    fn start_threads(&self, model: &Model) -> Result<Vec<DispatcherThread>> {
        let dispatcher = self.config.dispatcher();
        let (done_tx, done_rx) = crossbeam::channel::unbounded::<(String, Result<()>)>();
        let mut threads = Vec::with_capacity(model.threads().len());
        let mut expected = 0usize;

        for thread_entry in model.threads() {
            let thread = DispatcherThread::spawn(
                thread_entry.name(),
                Arc::clone(&self.router),
                dispatcher,
                thread_entry.watchdog(),
            )?;
            for component in thread_entry.components() {
                let entry = component.clone();
                let done = done_tx.clone();
                thread.post(move |ctx: &mut ThreadContext| {
                    let role = entry.role().to_string();
                    let _ = done.send((role, ctx.start_component(entry)));
                })?;
                expected += 1;
            }
            threads.push(thread);
        }
        drop(done_tx);

        for _ in 0..expected {
            match done_rx.recv() {
                Ok((_, Ok(()))) => {}
                Ok((role, Err(e))) => {
                    log::error!("[runtime] model '{}' component {} failed: {}", model.name(), role, e);
                    stop_all(threads);
                    return Err(Error::ComponentFailed(format!("{}: {}", role, e)));
                }
                Err(_) => {
                    stop_all(threads);
                    return Err(Error::ComponentFailed(format!(
                        "model '{}': dispatcher exited during startup",
                        model.name()
                    )));
                }
            }
        }
        Ok(threads)
    }

    /// Stop every thread of model `name` and return the unloaded model.
    pub fn unload_model(&self, name: &str) -> Result<Model> {
        let active = {
            let mut models = self.models.lock();
            let index = models
                .iter()
                .position(|m| m.model.name() == name)
                .ok_or_else(|| Error::ModelNotFound(name.to_string()))?;
            models.remove(index)
        };
        let ActiveModel { mut model, threads } = active;
        model.mark_model_alive(false)?;
        stop_all(threads);
        model.mark_model_loaded(false)?;
        log::info!("[runtime] model '{}' unloaded", name);
        Ok(model)
    }

    /// Unload every model, most recently loaded first.
    pub fn unload_all(&self) -> usize {
        let names: Vec<String> = self
            .models
            .lock()
            .iter()
            .rev()
            .map(|m| m.model.name().to_string())
            .collect();
        names
            .iter()
            .filter(|name| match self.unload_model(name) {
                Ok(_) => true,
                Err(e) => {
                    log::warn!("[runtime] unload of '{}' failed: {}", name, e);
                    false
                }
            })
            .count()
    }

    pub fn is_model_loaded(&self, name: &str) -> bool {
        self.models.lock().iter().any(|m| m.model.name() == name)
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models
            .lock()
            .iter()
            .map(|m| m.model.name().to_string())
            .collect()
    }

    /// State of a loaded model; `None` once unloaded.
    pub fn model_state(&self, name: &str) -> Option<(ModelState, bool)> {
        self.models
            .lock()
            .iter()
            .find(|m| m.model.name() == name)
            .map(|m| (m.model.state(), m.model.is_alive()))
    }

    pub fn mark_model_alive(&self, name: &str, alive: bool) -> Result<()> {
        let mut models = self.models.lock();
        let active = models
            .iter_mut()
            .find(|m| m.model.name() == name)
            .ok_or_else(|| Error::ModelNotFound(name.to_string()))?;
        active.model.mark_model_alive(alive)
    }

    /// Run `task` on dispatcher thread `thread` of any loaded model.
    pub fn post<F>(&self, thread: &str, task: F) -> Result<()>
    where
        F: FnOnce(&mut ThreadContext) + Send + 'static,
    {
        self.router.post_task(thread, Box::new(task))
    }

    /// Heartbeat of a loaded dispatcher thread, for watchdogs.
    pub fn thread_heartbeat(&self, thread: &str) -> Option<Arc<Heartbeat>> {
        self.models
            .lock()
            .iter()
            .flat_map(|m| m.threads.iter())
            .find(|t| t.name() == thread)
            .map(|t| Arc::clone(t.heartbeat()))
    }
}

impl Default for ModelRuntime {
    fn default() -> Self {
        Self::new(Arc::new(ServiceRouter::new()), RuntimeConfig::new())
    }
}

impl Drop for ModelRuntime {
    fn drop(&mut self) {
        self.unload_all();
    }
}

impl std::fmt::Debug for ModelRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRuntime")
            .field("models", &self.model_names())
            .field("config", &self.config)
            .finish()
    }
}

/// Stop threads in reverse spawn order.
fn stop_all(mut threads: Vec<DispatcherThread>) {
    while let Some(mut thread) = threads.pop() {
        thread.stop();
    }
}
