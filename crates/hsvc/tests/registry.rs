// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Component registry and model lifecycle integration tests

use hsvc::component::{
    Component, ComponentEntry, ComponentFactory, ComponentThreadEntry, DependencyEntry, Model,
    ModelState, ServiceEntry,
};
use hsvc::runtime::ThreadContext;
use hsvc::{Error, ModelRuntime, Result, Version};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

struct Idle;

impl Component for Idle {
    fn startup(&mut self, _ctx: &mut ThreadContext) -> Result<()> {
        Ok(())
    }
}

struct Broken;

impl Component for Broken {
    fn startup(&mut self, _ctx: &mut ThreadContext) -> Result<()> {
        Err(Error::ComponentFailed("refusing to start".into()))
    }
}

fn idle() -> ComponentFactory {
    ComponentFactory::from_fn(|_| Ok(Box::new(Idle)))
}

/// Factory counting create/destroy calls.
fn counted(created: &Arc<AtomicUsize>, destroyed: &Arc<AtomicUsize>) -> ComponentFactory {
    let created = Arc::clone(created);
    let destroyed = Arc::clone(destroyed);
    ComponentFactory::new(
        move |_| {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Idle))
        },
        move |component, _| {
            destroyed.fetch_add(1, Ordering::SeqCst);
            drop(component);
        },
    )
}

fn model(name: &str, thread: &str, roles: &[&str]) -> Model {
    let mut model = Model::new(name);
    let entry = model.add_thread_or_get(ComponentThreadEntry::new(thread, None));
    for role in roles {
        entry.add_component(ComponentEntry::new(thread, *role, idle()));
    }
    model
}

#[test]
fn test_registry_adds_are_idempotent() {
    let mut model = Model::new("M");
    assert!(model.add_thread(ComponentThreadEntry::new("T", None)));
    assert!(!model.add_thread(ComponentThreadEntry::new("T", None)));

    let thread = model.find_thread_mut("T").expect("thread");
    assert!(thread.add_component(ComponentEntry::new("ignored", "Svc", idle())));
    assert!(!thread.add_component(ComponentEntry::new("T", "Svc", idle())));

    let component = thread.find_component_mut("Svc").expect("component");
    assert_eq!(component.thread(), "T");
    assert!(component.add_supported_service(ServiceEntry::new("Echo", Version::new(1, 0, 0))));
    assert!(!component.add_supported_service(ServiceEntry::new("Echo", Version::new(2, 0, 0))));
    assert_eq!(
        component
            .add_supported_service_or_get(ServiceEntry::new("Echo", Version::new(3, 0, 0)))
            .version(),
        Version::new(1, 0, 0)
    );
    assert!(component.add_dependency(DependencyEntry::new("Clock")));
    assert!(!component.add_dependency(DependencyEntry::new("Clock")));
    assert!(component.remove_dependency("Clock"));
    assert!(!component.remove_dependency("Clock"));

    assert!(model.has_registered_component("Svc"));
    assert!(!model.has_registered_component("Clock"));
    let lookup = ComponentThreadEntry::new("T", Some(std::time::Duration::from_secs(1)));
    assert!(model.threads().find_thread(&lookup).is_some());
}

#[test]
fn test_model_state_machine() {
    let mut model = model("M", "T", &["Svc"]);
    assert_eq!(model.state(), ModelState::Initialized);
    assert!(matches!(model.mark_model_alive(true), Err(Error::ModelState(_))));
    assert!(matches!(model.mark_model_loaded(false), Err(Error::ModelState(_))));

    model.mark_model_loaded(true).expect("load");
    model.mark_model_alive(true).expect("alive");
    assert!(model.is_alive());
    assert!(matches!(model.mark_model_loaded(true), Err(Error::ModelState(_))));

    model.mark_model_loaded(false).expect("unload");
    assert_eq!(model.state(), ModelState::Unloaded);
    assert!(!model.is_alive());
    assert!(model.mark_model_loaded(true).is_err());
}

#[test]
fn test_runtime_rejects_duplicate_roles() {
    let runtime = ModelRuntime::default();
    runtime
        .load_model(model("A", "TA", &["Svc", "Clock"]))
        .expect("Failed to load first model");

    let clash = runtime.load_model(model("B", "TB", &["Svc"]));
    assert!(matches!(clash, Err(Error::DuplicateRole(role)) if role == "Svc"));
    assert!(!runtime.is_model_loaded("B"));

    let mut within = model("C", "TC1", &["Log"]);
    within.add_thread_or_get(ComponentThreadEntry::new("TC2", None))
        .add_component(ComponentEntry::new("TC2", "Log", idle()));
    assert!(matches!(runtime.load_model(within), Err(Error::DuplicateRole(_))));

    assert_eq!(runtime.model_names(), vec!["A".to_string()]);
}

#[test]
fn test_runtime_drives_model_state() {
    let created = Arc::new(AtomicUsize::new(0));
    let destroyed = Arc::new(AtomicUsize::new(0));
    let mut model = Model::new("M");
    for (thread, role) in [("T1", "One"), ("T2", "Two")] {
        model
            .add_thread_or_get(ComponentThreadEntry::new(thread, None))
            .add_component(ComponentEntry::new(thread, role, counted(&created, &destroyed)));
    }

    let runtime = ModelRuntime::default();
    runtime.load_model(model).expect("Failed to load model");
    assert_eq!(runtime.model_state("M"), Some((ModelState::Loaded, true)));
    assert_eq!(created.load(Ordering::SeqCst), 2);
    assert!(runtime.thread_heartbeat("T1").is_some());

    runtime.mark_model_alive("M", false).expect("alive flag");
    assert_eq!(runtime.model_state("M"), Some((ModelState::Loaded, false)));

    let unloaded = runtime.unload_model("M").expect("Failed to unload model");
    assert_eq!(unloaded.state(), ModelState::Unloaded);
    assert_eq!(destroyed.load(Ordering::SeqCst), 2);
    assert_eq!(runtime.model_state("M"), None);
    assert!(matches!(runtime.unload_model("M"), Err(Error::ModelNotFound(_))));
    assert!(!runtime.router().has_thread("T1"));

    // An unloaded model is terminal.
    assert!(matches!(runtime.load_model(unloaded), Err(Error::ModelState(_))));
}

#[test]
fn test_failed_component_rolls_back() {
    let created = Arc::new(AtomicUsize::new(0));
    let destroyed = Arc::new(AtomicUsize::new(0));
    let mut model = Model::new("M");
    model
        .add_thread_or_get(ComponentThreadEntry::new("T1", None))
        .add_component(ComponentEntry::new("T1", "Good", counted(&created, &destroyed)));
    model
        .add_thread_or_get(ComponentThreadEntry::new("T2", None))
        .add_component(ComponentEntry::new(
            "T2",
            "Bad",
            ComponentFactory::from_fn(|_| Ok(Box::new(Broken))),
        ));

    let runtime = ModelRuntime::default();
    assert!(matches!(runtime.load_model(model), Err(Error::ComponentFailed(_))));
    assert!(!runtime.is_model_loaded("M"));
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    assert!(!runtime.router().has_thread("T1"));
    assert!(!runtime.router().has_thread("T2"));
}

/// Queries the runtime from inside its own startup.
struct Introspect {
    runtime: Weak<ModelRuntime>,
    seen: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl Component for Introspect {
    fn startup(&mut self, ctx: &mut ThreadContext) -> Result<()> {
        let runtime = self
            .runtime
            .upgrade()
            .ok_or_else(|| Error::ComponentFailed("runtime gone".into()))?;
        let mut seen = self.seen.lock();
        seen.push(format!("names={:?}", runtime.model_names()));
        seen.push(format!("loaded={}", runtime.is_model_loaded("M")));
        seen.push(format!("heartbeat={}", runtime.thread_heartbeat(ctx.name()).is_some()));

        let clash = runtime.load_model(model("Other", "TX", &["Watcher"]));
        seen.push(format!("clash={}", matches!(clash, Err(Error::DuplicateRole(_)))));
        Ok(())
    }
}

#[test]
fn test_startup_may_call_back_into_runtime() {
    let runtime = Arc::new(ModelRuntime::default());
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let weak = Arc::downgrade(&runtime);
    let recorded = Arc::clone(&seen);
    let mut model = Model::new("M");
    model
        .add_thread_or_get(ComponentThreadEntry::new("T", None))
        .add_component(ComponentEntry::new(
            "T",
            "Watcher",
            ComponentFactory::from_fn(move |_| {
                Ok(Box::new(Introspect {
                    runtime: weak.clone(),
                    seen: Arc::clone(&recorded),
                }))
            }),
        ));

    runtime.load_model(model).expect("Failed to load model");
    assert_eq!(
        *seen.lock(),
        vec![
            "names=[]".to_string(),
            "loaded=false".to_string(),
            "heartbeat=false".to_string(),
            "clash=true".to_string(),
        ]
    );
    assert_eq!(runtime.model_names(), vec!["M".to_string()]);
    assert!(!runtime.router().has_thread("TX"));

    runtime.unload_model("M").expect("Failed to unload model");
}
