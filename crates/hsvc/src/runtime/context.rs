// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-thread owner of Stubs, Proxies, listeners and components.

use super::dispatcher::ThreadPort;
use super::router::ServiceRouter;
use super::worker::WorkerThread;
use crate::component::{Component, ComponentEntry};
use crate::config::DispatcherConfig;
use crate::error::{Error, Result};
use crate::event::{ResponseEvent, ResultType, ServiceEvent};
use crate::proxy::{ListenerId, Proxy, ProxyListener};
use crate::service::{InterfaceDescriptor, ProxyAddress, StubAddress};
use crate::stub::{Stub, StubHandler};
use std::collections::HashMap;
use std::sync::Arc;

struct StubHost {
    stub: Stub,
    handler: Box<dyn StubHandler>,
}

struct HostedComponent {
    entry: ComponentEntry,
    component: Box<dyn Component>,
}

/// State owned by one dispatcher thread.
///
/// Only reachable from tasks and components running on that thread, so
/// nothing in here is locked.
pub struct ThreadContext {
    port: ThreadPort,
    router: Arc<ServiceRouter>,
    config: DispatcherConfig,
    stubs: HashMap<String, StubHost>,
    proxies: HashMap<String, Proxy>,
    listeners: HashMap<ListenerId, Box<dyn ProxyListener>>,
    next_listener: u64,
    components: Vec<HostedComponent>,
    workers: Vec<WorkerThread>,
}

impl ThreadContext {
    pub(crate) fn new(port: ThreadPort, router: Arc<ServiceRouter>, config: DispatcherConfig) -> Self {
        Self {
            port,
            router,
            config,
            stubs: HashMap::new(),
            proxies: HashMap::new(),
            listeners: HashMap::new(),
            next_listener: 0,
            components: Vec::new(),
            workers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.port.name()
    }

    /// Inbox of this thread, for posting work back from elsewhere.
    pub fn port(&self) -> &ThreadPort {
        &self.port
    }

    pub fn router(&self) -> &Arc<ServiceRouter> {
        &self.router
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn add_listener(&mut self, listener: Box<dyn ProxyListener>) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId::new(self.next_listener);
        self.listeners.insert(id, listener);
        id
    }

    /// Detach `id` from every Proxy and drop it. Its pending notifications
    /// are discarded on arrival.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let roles: Vec<String> = self
            .proxies
            .iter()
            .filter(|(_, proxy)| proxy.clients().contains(&id))
            .map(|(role, _)| role.clone())
            .collect();
        for role in roles {
            self.detach_proxy(&role, id);
        }
        self.listeners.remove(&id).is_some()
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(&id)
    }

    // ========================================================================
    // Proxies
    // ========================================================================

    /// Attach `listener` as a client of the Proxy for `role`, creating the
    /// Proxy on first use.
    ///
    /// The listener gets `on_service_connected(true)` once the Stub is (or
    /// becomes) available.
    pub fn attach_proxy(
        &mut self,
        interface: Arc<InterfaceDescriptor>,
        role: &str,
        listener: ListenerId,
    ) -> Result<ProxyAddress> {
        if !self.listeners.contains_key(&listener) {
            return Err(Error::ListenerNotFound(listener.raw()));
        }
        let address = ProxyAddress::new(interface.service().clone(), role, self.name());
        if !address.is_valid() {
            return Err(Error::InvalidAddress(address.to_path()));
        }

        if let Some(proxy) = self.proxies.get_mut(role) {
            if proxy.address() != &address {
                return Err(Error::InvalidAddress(format!(
                    "{} already used by {}",
                    role,
                    proxy.address()
                )));
            }
            if proxy.attach_client(listener) && proxy.is_connected() {
                let role = role.to_string();
                self.port
                    .post_task(move |ctx| ctx.notify_connected(&role, listener))?;
            }
            return Ok(address);
        }

        let mut proxy = Proxy::new(address.clone(), interface, Arc::clone(&self.router));
        proxy.attach_client(listener);
        self.proxies.insert(role.to_string(), proxy);
        self.router.register_proxy(&address);
        log::debug!("[context] {} created proxy {}", self.name(), address);
        Ok(address)
    }

    /// Detach `listener`; the last client destroys the Proxy.
    pub fn detach_proxy(&mut self, role: &str, listener: ListenerId) -> bool {
        let Some(proxy) = self.proxies.get_mut(role) else {
            return false;
        };
        if !proxy.clients().contains(&listener) {
            return false;
        }
        if proxy.detach_client(listener) == 0 {
            if let Some(mut proxy) = self.proxies.remove(role) {
                proxy.shutdown();
                log::debug!("[context] {} destroyed proxy {}", self.name(), proxy.address());
            }
        }
        true
    }

    pub fn proxy(&self, role: &str) -> Option<&Proxy> {
        self.proxies.get(role)
    }

    pub fn proxy_mut(&mut self, role: &str) -> Option<&mut Proxy> {
        self.proxies.get_mut(role)
    }

    fn notify_connected(&mut self, role: &str, listener: ListenerId) {
        let (Some(proxy), Some(client)) = (self.proxies.get_mut(role), self.listeners.get_mut(&listener))
        else {
            return;
        };
        if proxy.is_connected() && proxy.clients().contains(&listener) {
            client.on_service_connected(listener, true, proxy);
        }
    }

    // ========================================================================
    // Stubs
    // ========================================================================

    /// Publish a Stub for `role` served by `handler` on this thread.
    pub fn register_stub(
        &mut self,
        interface: Arc<InterfaceDescriptor>,
        role: &str,
        handler: Box<dyn StubHandler>,
    ) -> Result<StubAddress> {
        let address = StubAddress::new(interface.service().clone(), role, self.name());
        if self.stubs.contains_key(role) {
            return Err(Error::DuplicateRole(address.to_path()));
        }
        self.router.register_stub(&address)?;

        let mut host = StubHost {
            stub: Stub::new(address.clone(), interface, Arc::clone(&self.router)),
            handler,
        };
        host.handler.on_startup(&mut host.stub);
        self.stubs.insert(role.to_string(), host);
        Ok(address)
    }

    /// Cancel pending requests and withdraw the Stub of `role`.
    pub fn unregister_stub(&mut self, role: &str) -> bool {
        let Some(mut host) = self.stubs.remove(role) else {
            return false;
        };
        host.stub.unlock_all_requests();
        host.handler.on_shutdown(&mut host.stub);
        self.router.unregister_stub(host.stub.address())
    }

    pub fn stub(&self, role: &str) -> Option<&Stub> {
        self.stubs.get(role).map(|host| &host.stub)
    }

    pub fn stub_mut(&mut self, role: &str) -> Option<&mut Stub> {
        self.stubs.get_mut(role).map(|host| &mut host.stub)
    }

    /// Run `f` with the Stub of `role` and its handler.
    pub fn with_stub<R>(
        &mut self,
        role: &str,
        f: impl FnOnce(&mut Stub, &mut dyn StubHandler) -> R,
    ) -> Option<R> {
        let host = self.stubs.get_mut(role)?;
        Some(f(&mut host.stub, host.handler.as_mut()))
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub(crate) fn dispatch(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::Request(event) => match self.stubs.get_mut(event.target.role()) {
                Some(StubHost { stub, handler }) if stub.address() == &event.target => {
                    stub.process_request_event(handler.as_mut(), event);
                }
                _ => {
                    log::debug!(
                        "[context] {} no stub {} for request {:#x}",
                        self.name(),
                        event.target,
                        event.message_id
                    );
                    self.router.send_response(ResponseEvent::without_data(
                        event.source,
                        event.message_id,
                        ResultType::MessageUndelivered,
                        event.sequence_number,
                    ));
                }
            },
            ServiceEvent::NotifyRequest(event) => match self.stubs.get_mut(event.target.role()) {
                Some(host) if host.stub.address() == &event.target => {
                    host.stub.process_attribute_event(event);
                }
                _ => log::debug!("[context] {} no stub {} for notify request", self.name(), event.target),
            },
            ServiceEvent::Response(event) => match self.proxies.get_mut(event.target.role()) {
                Some(proxy) if proxy.address() == &event.target => {
                    proxy.process_response(event);
                }
                _ => log::debug!("[context] {} response for unknown proxy {}", self.name(), event.target),
            },
            ServiceEvent::Notification(event) => {
                let Some(proxy) = self.proxies.get_mut(event.proxy.role()) else {
                    log::debug!("[context] {} notification for destroyed proxy {}", self.name(), event.proxy);
                    return;
                };
                match self.listeners.get_mut(&event.listener) {
                    Some(listener) => listener.on_notification(&event, proxy),
                    None => {
                        debug_assert!(event.listener.raw() <= self.next_listener);
                        log::warn!(
                            "[context] {} notification {:#x} for removed {}",
                            self.name(),
                            event.message_id,
                            event.listener
                        );
                    }
                }
            }
            ServiceEvent::Connection(event) => {
                let Some(proxy) = self.proxies.get_mut(event.proxy.role()) else {
                    return;
                };
                if proxy.address() != &event.proxy || !proxy.service_connected(event.connected, &event.stub) {
                    return;
                }
                for client in proxy.clients().to_vec() {
                    if let Some(listener) = self.listeners.get_mut(&client) {
                        listener.on_service_connected(client, event.connected, proxy);
                    }
                }
            }
        }
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Instantiate `entry` through its factory, start it and its workers.
    pub fn start_component(&mut self, entry: ComponentEntry) -> Result<()> {
        let factory = entry
            .factory()
            .cloned()
            .ok_or_else(|| Error::ComponentFailed(format!("{}: no factory", entry.role())))?;
        let mut component = factory.create(&entry)?;
        if let Err(e) = component.startup(self) {
            factory.destroy(component, &entry);
            return Err(Error::ComponentFailed(format!("{}: {}", entry.role(), e)));
        }

        for worker in entry.workers() {
            let Some(consumer) = component.worker_consumer(worker) else {
                log::debug!("[context] {} worker {} not started", entry.role(), worker.name());
                continue;
            };
            match WorkerThread::spawn(worker, consumer, self.config) {
                Ok(thread) => self.workers.push(thread),
                Err(e) => {
                    component.shutdown(self);
                    factory.destroy(component, &entry);
                    return Err(e);
                }
            }
        }

        log::info!("[context] {} started component {}", self.name(), entry.role());
        self.components.push(HostedComponent { entry, component });
        Ok(())
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Worker thread by qualified name.
    pub fn worker(&self, name: &str) -> Option<&WorkerThread> {
        self.workers.iter().find(|w| w.name() == name)
    }

    /// Tear everything down in reverse order of creation.
    pub(crate) fn shutdown(&mut self) {
        while let Some(HostedComponent { entry, mut component }) = self.components.pop() {
            component.shutdown(self);
            if let Some(factory) = entry.factory() {
                factory.destroy(component, &entry);
            }
            log::info!("[context] {} stopped component {}", self.name(), entry.role());
        }
        while let Some(mut worker) = self.workers.pop() {
            worker.stop();
        }

        let roles: Vec<String> = self.stubs.keys().cloned().collect();
        for role in roles {
            self.unregister_stub(&role);
        }
        for (_, mut proxy) in self.proxies.drain() {
            proxy.shutdown();
        }
        self.listeners.clear();
    }
}

impl std::fmt::Debug for ThreadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadContext")
            .field("name", &self.name())
            .field("stubs", &self.stubs.len())
            .field("proxies", &self.proxies.len())
            .field("listeners", &self.listeners.len())
            .field("components", &self.components.len())
            .finish()
    }
}
