// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry entries: services, worker threads, dependencies, components and
//! component threads.

use super::{ComponentFactory, EntryList, RegistryEntry};
use crate::config::PATH_SEPARATOR;
use crate::service::Version;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// ServiceEntry
// ============================================================================

/// Service supported (implemented) by a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    name: String,
    version: Version,
}

impl ServiceEntry {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Version {
        self.version
    }
}

impl RegistryEntry for ServiceEntry {
    fn key(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        !self.name.is_empty() && self.version.is_valid()
    }
}

// ============================================================================
// WorkerThreadEntry
// ============================================================================

/// Subordinate thread spawned by a component.
///
/// The stored name is qualified by the owning dispatcher thread
/// (`T::Worker`) so two components in different threads may reuse a local
/// worker name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerThreadEntry {
    name: String,
    consumer: String,
    watchdog: Option<Duration>,
}

impl WorkerThreadEntry {
    pub fn new(
        owner_thread: &str,
        name: &str,
        consumer: impl Into<String>,
        watchdog: Option<Duration>,
    ) -> Self {
        Self {
            name: format!("{}{}{}", owner_thread, PATH_SEPARATOR, name),
            consumer: consumer.into(),
            watchdog,
        }
    }

    /// Qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without the owner prefix.
    pub fn local_name(&self) -> &str {
        self.name
            .rsplit_once(PATH_SEPARATOR)
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    pub fn watchdog(&self) -> Option<Duration> {
        self.watchdog
    }
}

impl RegistryEntry for WorkerThreadEntry {
    fn key(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        !self.local_name().is_empty() && !self.consumer.is_empty()
    }
}

// ============================================================================
// DependencyEntry
// ============================================================================

/// Role a component needs before it can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEntry {
    role: String,
}

impl DependencyEntry {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

impl RegistryEntry for DependencyEntry {
    fn key(&self) -> &str {
        &self.role
    }

    fn is_valid(&self) -> bool {
        !self.role.is_empty()
    }
}

pub type ServiceList = EntryList<ServiceEntry>;
pub type WorkerThreadList = EntryList<WorkerThreadEntry>;
pub type DependencyList = EntryList<DependencyEntry>;
pub type ComponentList = EntryList<ComponentEntry>;
pub type ComponentThreadList = EntryList<ComponentThreadEntry>;

// ============================================================================
// ComponentEntry
// ============================================================================

/// Opaque per-component payload handed to the factory.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Component declaration: role, owning thread and lifecycle binding.
#[derive(Clone, Default)]
pub struct ComponentEntry {
    role: String,
    thread: String,
    factory: Option<ComponentFactory>,
    services: ServiceList,
    workers: WorkerThreadList,
    dependencies: DependencyList,
    user_data: Option<UserData>,
}

impl ComponentEntry {
    pub fn new(thread: impl Into<String>, role: impl Into<String>, factory: ComponentFactory) -> Self {
        Self {
            role: role.into(),
            thread: thread.into(),
            factory: Some(factory),
            ..Self::default()
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn thread(&self) -> &str {
        &self.thread
    }

    pub fn factory(&self) -> Option<&ComponentFactory> {
        self.factory.as_ref()
    }

    pub fn set_factory(&mut self, factory: ComponentFactory) {
        self.factory = Some(factory);
    }

    pub fn services(&self) -> &ServiceList {
        &self.services
    }

    pub fn workers(&self) -> &WorkerThreadList {
        &self.workers
    }

    pub fn dependencies(&self) -> &DependencyList {
        &self.dependencies
    }

    pub fn add_supported_service(&mut self, entry: ServiceEntry) -> bool {
        self.services.add(entry)
    }

    pub fn add_supported_service_or_get(&mut self, entry: ServiceEntry) -> &mut ServiceEntry {
        self.services.add_or_get(entry)
    }

    pub fn remove_supported_service(&mut self, name: &str) -> bool {
        self.services.remove(name)
    }

    /// Add a worker thread; `name` is qualified with this component's thread.
    pub fn add_worker_thread(
        &mut self,
        name: &str,
        consumer: &str,
        watchdog: Option<Duration>,
    ) -> bool {
        let entry = WorkerThreadEntry::new(&self.thread, name, consumer, watchdog);
        self.workers.add(entry)
    }

    pub fn add_worker_thread_or_get(&mut self, entry: WorkerThreadEntry) -> &mut WorkerThreadEntry {
        self.workers.add_or_get(entry)
    }

    /// Remove by qualified or local name.
    pub fn remove_worker_thread(&mut self, name: &str) -> bool {
        if self.workers.remove(name) {
            return true;
        }
        let qualified = format!("{}{}{}", self.thread, PATH_SEPARATOR, name);
        self.workers.remove(&qualified)
    }

    /// Move to thread `thread`, re-qualifying every worker name.
    pub(crate) fn set_thread(&mut self, thread: &str) {
        if self.thread == thread {
            return;
        }
        let mut workers = WorkerThreadList::new();
        for worker in self.workers.iter() {
            workers.add(WorkerThreadEntry::new(
                thread,
                worker.local_name(),
                worker.consumer(),
                worker.watchdog(),
            ));
        }
        self.workers = workers;
        self.thread = thread.to_string();
    }

    pub fn add_dependency(&mut self, entry: DependencyEntry) -> bool {
        self.dependencies.add(entry)
    }

    pub fn add_dependency_or_get(&mut self, entry: DependencyEntry) -> &mut DependencyEntry {
        self.dependencies.add_or_get(entry)
    }

    pub fn remove_dependency(&mut self, role: &str) -> bool {
        self.dependencies.remove(role)
    }

    pub fn set_user_data(&mut self, data: UserData) {
        self.user_data = Some(data);
    }

    /// User data downcast to `T`.
    pub fn user_data<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.user_data.as_deref().and_then(|d| d.downcast_ref::<T>())
    }
}

impl RegistryEntry for ComponentEntry {
    fn key(&self) -> &str {
        &self.role
    }

    fn is_valid(&self) -> bool {
        !self.role.is_empty() && self.factory.is_some()
    }
}

impl PartialEq for ComponentEntry {
    fn eq(&self, other: &Self) -> bool {
        let same_data = match (&self.user_data, &other.user_data) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.role == other.role
            && self.thread == other.thread
            && self.factory == other.factory
            && self.services == other.services
            && self.workers == other.workers
            && self.dependencies == other.dependencies
            && same_data
    }
}

impl fmt::Debug for ComponentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentEntry")
            .field("role", &self.role)
            .field("thread", &self.thread)
            .field("factory", &self.factory.is_some())
            .field("services", &self.services)
            .field("workers", &self.workers)
            .field("dependencies", &self.dependencies)
            .field("user_data", &self.user_data.is_some())
            .finish()
    }
}

// ============================================================================
// ComponentThreadEntry
// ============================================================================

/// Dispatcher thread and the components it hosts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentThreadEntry {
    name: String,
    components: ComponentList,
    watchdog: Option<Duration>,
}

impl ComponentThreadEntry {
    pub fn new(name: impl Into<String>, watchdog: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            components: ComponentList::new(),
            watchdog,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn watchdog(&self) -> Option<Duration> {
        self.watchdog
    }

    pub fn components(&self) -> &ComponentList {
        &self.components
    }

    /// Add a component. Its thread name is forced to this thread.
    pub fn add_component(&mut self, mut entry: ComponentEntry) -> bool {
        entry.set_thread(&self.name);
        self.components.add(entry)
    }

    pub fn add_component_or_get(&mut self, mut entry: ComponentEntry) -> &mut ComponentEntry {
        entry.set_thread(&self.name);
        self.components.add_or_get(entry)
    }

    pub fn remove_component(&mut self, role: &str) -> bool {
        self.components.remove(role)
    }

    pub fn find_component(&self, role: &str) -> Option<&ComponentEntry> {
        self.components.find(role)
    }

    pub fn find_component_mut(&mut self, role: &str) -> Option<&mut ComponentEntry> {
        self.components.find_mut(role)
    }
}

impl RegistryEntry for ComponentThreadEntry {
    fn key(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        !self.name.is_empty() && self.components.is_valid()
    }
}

impl EntryList<ComponentThreadEntry> {
    /// Thread with the same name as `entry`.
    pub fn find_thread(&self, entry: &ComponentThreadEntry) -> Option<&ComponentThreadEntry> {
        self.find(entry.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::runtime::ThreadContext;

    struct Idle;

    impl Component for Idle {
        fn startup(&mut self, _ctx: &mut ThreadContext) -> crate::Result<()> {
            Ok(())
        }
    }

    fn factory() -> ComponentFactory {
        ComponentFactory::from_fn(|_| Ok(Box::new(Idle)))
    }

    #[test]
    fn test_component_validity() {
        assert!(ComponentEntry::new("T", "Svc", factory()).is_valid());
        assert!(!ComponentEntry::new("T", "", factory()).is_valid());
        assert!(!ComponentEntry::default().is_valid());
    }

    #[test]
    fn test_worker_names_are_qualified() {
        let mut entry = ComponentEntry::new("T", "Svc", factory());
        assert!(entry.add_worker_thread("Io", "IoConsumer", None));
        assert!(!entry.add_worker_thread("Io", "Other", None));

        let worker = entry.workers().iter().next().expect("worker");
        assert_eq!(worker.name(), "T::Io");
        assert_eq!(worker.local_name(), "Io");
        assert!(entry.remove_worker_thread("Io"));
        assert!(entry.workers().is_empty());
    }

    #[test]
    fn test_thread_forces_component_thread_name() {
        let mut thread = ComponentThreadEntry::new("T", None);
        thread.add_component(ComponentEntry::new("Elsewhere", "Svc", factory()));
        assert_eq!(thread.find_component("Svc").map(|c| c.thread()), Some("T"));
    }

    #[test]
    fn test_moved_component_requalifies_workers() {
        let mut entry = ComponentEntry::new("Elsewhere", "Svc", factory());
        assert!(entry.add_worker_thread("Io", "IoConsumer", Some(Duration::from_secs(2))));

        let mut thread = ComponentThreadEntry::new("T", None);
        let moved = thread.add_component_or_get(entry);
        assert_eq!(moved.thread(), "T");
        let worker = moved.workers().find("T::Io").expect("requalified worker");
        assert_eq!(worker.local_name(), "Io");
        assert_eq!(worker.consumer(), "IoConsumer");
        assert_eq!(worker.watchdog(), Some(Duration::from_secs(2)));
        assert!(moved.workers().find("Elsewhere::Io").is_none());
        assert!(moved.remove_worker_thread("Io"));
    }

    #[test]
    fn test_find_thread_matches_by_name_only() {
        let mut list = ComponentThreadList::new();
        let mut hosted = ComponentThreadEntry::new("T", None);
        hosted.add_component(ComponentEntry::new("T", "Svc", factory()));
        list.add(hosted);

        let lookup = ComponentThreadEntry::new("T", Some(Duration::from_secs(1)));
        let found = list.find_thread(&lookup).expect("same name");
        assert_eq!(found.components().len(), 1);
        assert!(list.find_thread(&ComponentThreadEntry::new("U", None)).is_none());
    }

    #[test]
    fn test_user_data_downcast() {
        let mut entry = ComponentEntry::new("T", "Svc", factory());
        entry.set_user_data(Arc::new(42u32));
        assert_eq!(entry.user_data::<u32>(), Some(&42));
        assert_eq!(entry.user_data::<String>(), None);
    }
}
