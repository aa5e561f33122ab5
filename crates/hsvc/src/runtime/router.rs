// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Event routing between dispatcher threads.
//!
//! # Architecture
//!
//! ```text
//! Proxy ──send_request──> ServiceRouter ──route(thread)──┬─> ThreadPort (local inbox)
//!                              │                          └─> Transport (remote frame)
//!                              ├── stubs:   role -> StubAddress
//!                              └── proxies: role -> [ProxyAddress]
//! ```
//!
//! Registering a stub connects every waiting proxy of the same role whose
//! service it accepts; unregistering it disconnects them. Connection events
//! are posted while the role table is locked, so a proxy always sees
//! connect/disconnect in registration order.

use super::dispatcher::{ThreadPort, ThreadTask};
use crate::error::{Error, Result};
use crate::event::{
    decode_frame, encode_event, ConnectionEvent, NotifyRequestEvent, RequestEvent, ResponseEvent,
    ServiceEvent,
};
use crate::service::{ProxyAddress, StubAddress};
use crate::stream::SharedBuffer;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Byte-level link to another process.
///
/// Receives encoded frames (see [`crate::event::RemoteEvent`]) addressed to a
/// thread registered with [`ServiceRouter::register_remote_thread`]. The peer
/// side hands received frames to [`ServiceRouter::receive_frame`].
pub trait Transport: Send + Sync {
    fn send_frame(&self, thread: &str, frame: SharedBuffer) -> Result<()>;
}

/// Where events for a thread go.
#[derive(Clone)]
enum ThreadRoute {
    Local(ThreadPort),
    Remote,
}

/// Delivery counters.
#[derive(Debug, Default)]
pub struct RouterStats {
    pub delivered: AtomicU64,
    pub remote_frames: AtomicU64,
    pub undelivered: AtomicU64,
}

impl RouterStats {
    /// (delivered, remote_frames, undelivered)
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.delivered.load(Ordering::Relaxed),
            self.remote_frames.load(Ordering::Relaxed),
            self.undelivered.load(Ordering::Relaxed),
        )
    }
}

#[derive(Default)]
struct RoleTable {
    stubs: HashMap<String, StubAddress>,
    proxies: HashMap<String, Vec<ProxyAddress>>,
}

/// Process-wide event router. Shared as `Arc<ServiceRouter>`.
pub struct ServiceRouter {
    threads: DashMap<String, ThreadRoute>,
    roles: Mutex<RoleTable>,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    stats: RouterStats,
}

impl ServiceRouter {
    pub fn new() -> Self {
        Self {
            threads: DashMap::new(),
            roles: Mutex::new(RoleTable::default()),
            transport: RwLock::new(None),
            stats: RouterStats::default(),
        }
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    // ========================================================================
    // Thread routes
    // ========================================================================

    /// Route events for `port.name()` to its inbox.
    pub fn register_thread(&self, port: ThreadPort) -> Result<()> {
        match self.threads.entry(port.name().to_string()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                Err(Error::DuplicateThread(entry.key().clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                log::debug!("[router] thread {} registered", port.name());
                entry.insert(ThreadRoute::Local(port));
                Ok(())
            }
        }
    }

    /// Route events for `name` through the transport.
    pub fn register_remote_thread(&self, name: &str) -> Result<()> {
        match self.threads.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::DuplicateThread(name.to_string())),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                log::debug!("[router] remote thread {} registered", name);
                entry.insert(ThreadRoute::Remote);
                Ok(())
            }
        }
    }

    /// Remove the route of `name`. Returns `true` if it existed.
    pub fn unregister_thread(&self, name: &str) -> bool {
        self.threads.remove(name).is_some()
    }

    /// Remove the local route of `port`, leaving a newer registration under
    /// the same name untouched.
    pub(crate) fn unregister_port(&self, port: &ThreadPort) -> bool {
        self.threads
            .remove_if(port.name(), |_, route| {
                matches!(route, ThreadRoute::Local(p) if p.same_port(port))
            })
            .is_some()
    }

    pub fn is_local_thread(&self, name: &str) -> bool {
        self.threads
            .get(name)
            .is_some_and(|route| matches!(route.value(), ThreadRoute::Local(_)))
    }

    pub fn has_thread(&self, name: &str) -> bool {
        self.threads.contains_key(name)
    }

    /// Attach (or replace) the transport used for remote threads.
    pub fn set_transport(&self, transport: Arc<dyn Transport>) {
        *self.transport.write() = Some(transport);
    }

    pub fn clear_transport(&self) {
        *self.transport.write() = None;
    }

    // ========================================================================
    // Stub / Proxy registry
    // ========================================================================

    /// Publish a stub and connect every waiting proxy it accepts.
    ///
    /// The stub may live on a remote thread; requests then travel through the
    /// transport.
    pub fn register_stub(&self, stub: &StubAddress) -> Result<()> {
        if !stub.is_valid() {
            return Err(Error::InvalidAddress(stub.to_path()));
        }
        let mut roles = self.roles.lock();
        if let Some(existing) = roles.stubs.get(stub.role()) {
            return Err(Error::DuplicateRole(existing.to_path()));
        }
        roles.stubs.insert(stub.role().to_string(), stub.clone());
        log::info!("[router] stub {} registered", stub);

        if let Some(proxies) = roles.proxies.get(stub.role()) {
            for proxy in proxies.iter().filter(|p| stub.accepts(p)) {
                self.post_connection(proxy, stub, true);
            }
        }
        Ok(())
    }

    /// Withdraw a stub and disconnect its proxies. Returns `false` if `stub`
    /// was not the registered stub of its role.
    pub fn unregister_stub(&self, stub: &StubAddress) -> bool {
        let mut roles = self.roles.lock();
        if roles.stubs.get(stub.role()) != Some(stub) {
            return false;
        }
        roles.stubs.remove(stub.role());
        log::info!("[router] stub {} unregistered", stub);

        if let Some(proxies) = roles.proxies.get(stub.role()) {
            for proxy in proxies.iter().filter(|p| stub.accepts(p)) {
                self.post_connection(proxy, stub, false);
            }
        }
        true
    }

    /// Stub currently serving `role`.
    pub fn find_stub(&self, role: &str) -> Option<StubAddress> {
        self.roles.lock().stubs.get(role).cloned()
    }

    /// Record a proxy. If a compatible stub is already registered, a
    /// connection event is posted to the proxy and its address returned.
    pub fn register_proxy(&self, proxy: &ProxyAddress) -> Option<StubAddress> {
        let mut roles = self.roles.lock();
        let waiting = roles.proxies.entry(proxy.role().to_string()).or_default();
        if !waiting.contains(proxy) {
            waiting.push(proxy.clone());
        }
        log::debug!("[router] proxy {} registered", proxy);

        let stub = roles.stubs.get(proxy.role()).filter(|s| s.accepts(proxy)).cloned()?;
        self.post_connection(proxy, &stub, true);
        Some(stub)
    }

    pub fn unregister_proxy(&self, proxy: &ProxyAddress) -> bool {
        let mut roles = self.roles.lock();
        let Some(waiting) = roles.proxies.get_mut(proxy.role()) else {
            return false;
        };
        let before = waiting.len();
        waiting.retain(|p| p != proxy);
        let removed = waiting.len() != before;
        if waiting.is_empty() {
            roles.proxies.remove(proxy.role());
        }
        if removed {
            log::debug!("[router] proxy {} unregistered", proxy);
        }
        removed
    }

    pub fn proxy_count(&self, role: &str) -> usize {
        self.roles.lock().proxies.get(role).map_or(0, Vec::len)
    }

    // ========================================================================
    // Delivery
    // ========================================================================

    pub fn send_request(&self, event: RequestEvent) -> Result<()> {
        self.deliver(ServiceEvent::Request(event))
    }

    pub fn send_notify_request(&self, event: NotifyRequestEvent) -> Result<()> {
        self.deliver(ServiceEvent::NotifyRequest(event))
    }

    /// Deliver a response. Failures are logged; a vanished proxy has nobody
    /// left to tell.
    pub fn send_response(&self, event: ResponseEvent) -> bool {
        let target = event.target.clone();
        match self.deliver(ServiceEvent::Response(event)) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("[router] response for {} dropped: {}", target, e);
                false
            }
        }
    }

    /// Deliver any event to its target thread.
    pub fn post_event(&self, event: ServiceEvent) -> Result<()> {
        self.deliver(event)
    }

    /// Run `task` on local thread `thread`.
    pub fn post_task(&self, thread: &str, task: ThreadTask) -> Result<()> {
        match self.route(thread) {
            Some(ThreadRoute::Local(port)) => port.post_boxed(task),
            Some(ThreadRoute::Remote) | None => Err(Error::ThreadNotFound(thread.to_string())),
        }
    }

    /// Decode a frame received by a transport and deliver it locally.
    ///
    /// Frames for threads that are not local are rejected, never forwarded.
    pub fn receive_frame(&self, frame: SharedBuffer) -> Result<()> {
        let event = decode_frame(frame)?;
        let thread = event.target_thread().to_string();
        match self.route(&thread) {
            Some(ThreadRoute::Local(port)) => {
                port.send_event(event)?;
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            _ => {
                self.stats.undelivered.fetch_add(1, Ordering::Relaxed);
                log::warn!("[router] frame for non-local thread {} dropped", thread);
                Err(Error::ThreadNotFound(thread))
            }
        }
    }

    fn route(&self, thread: &str) -> Option<ThreadRoute> {
        self.threads.get(thread).map(|route| route.value().clone())
    }

    fn deliver(&self, event: ServiceEvent) -> Result<()> {
        let thread = event.target_thread().to_string();
        let outcome = match self.route(&thread) {
            Some(ThreadRoute::Local(port)) => port.send_event(event),
            Some(ThreadRoute::Remote) => self.send_remote(&thread, &event),
            None => Err(Error::ThreadNotFound(thread)),
        };
        let counter = if outcome.is_ok() {
            &self.stats.delivered
        } else {
            &self.stats.undelivered
        };
        counter.fetch_add(1, Ordering::Relaxed);
        outcome
    }

    fn send_remote(&self, thread: &str, event: &ServiceEvent) -> Result<()> {
        let transport = self.transport.read().clone().ok_or(Error::NoTransport)?;
        let frame = encode_event(event)?;
        transport.send_frame(thread, frame)?;
        self.stats.remote_frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn post_connection(&self, proxy: &ProxyAddress, stub: &StubAddress, connected: bool) {
        let event = ConnectionEvent::new(proxy.clone(), stub.clone(), connected);
        if let Err(e) = self.deliver(ServiceEvent::Connection(event)) {
            log::warn!(
                "[router] connection({}) for {} not delivered: {}",
                connected,
                proxy,
                e
            );
        }
    }
}

impl Default for ServiceRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let roles = self.roles.lock();
        f.debug_struct("ServiceRouter")
            .field("threads", &self.threads.len())
            .field("stubs", &roles.stubs.len())
            .field("proxy_roles", &roles.proxies.len())
            .field("transport", &self.transport.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::dispatcher::Envelope;
    use crate::service::{ServiceItem, ServiceKind, Version};
    use crossbeam::channel::{unbounded, Receiver};

    fn echo(minor: u32) -> ServiceItem {
        ServiceItem::new("Echo", Version::new(1, minor, 0), ServiceKind::Local)
    }

    fn port(name: &str) -> (ThreadPort, Receiver<Envelope>) {
        let (tx, rx) = unbounded();
        (ThreadPort::new(name, tx), rx)
    }

    fn next_connection(rx: &Receiver<Envelope>) -> ConnectionEvent {
        match rx.try_recv().expect("event queued") {
            Envelope::Event(ServiceEvent::Connection(e)) => e,
            other => panic!("unexpected envelope {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_thread_rejected() {
        let router = ServiceRouter::new();
        let (a, _rx) = port("T");
        let (b, _rx2) = port("T");
        router.register_thread(a.clone()).expect("first");
        assert!(matches!(router.register_thread(b.clone()), Err(Error::DuplicateThread(_))));
        assert!(!router.unregister_port(&b));
        assert!(router.unregister_port(&a));
        assert!(!router.has_thread("T"));
    }

    #[test]
    fn test_stub_connects_waiting_compatible_proxies() {
        let router = ServiceRouter::new();
        let (client, rx) = port("C");
        router.register_thread(client).expect("register");

        let proxy = ProxyAddress::new(echo(0), "Svc", "C");
        let newer = ProxyAddress::new(echo(5), "Svc", "C2");
        assert!(router.register_proxy(&proxy).is_none());
        assert!(router.register_proxy(&newer).is_none());

        let stub = StubAddress::new(echo(2), "Svc", "S");
        router.register_stub(&stub).expect("stub");
        let event = next_connection(&rx);
        assert!(event.connected);
        assert_eq!(event.stub, stub);
        // Echo 1.5 proxy is not served by a 1.2 stub.
        assert_eq!(router.stats().snapshot().2, 0);

        assert!(matches!(
            router.register_stub(&StubAddress::new(echo(2), "Svc", "S2")),
            Err(Error::DuplicateRole(_))
        ));

        assert!(router.unregister_stub(&stub));
        assert!(!next_connection(&rx).connected);
        assert!(!router.unregister_stub(&stub));
    }

    #[test]
    fn test_unknown_thread_is_not_found() {
        let router = ServiceRouter::new();
        let event = ResponseEvent::without_data(
            ProxyAddress::new(echo(0), "Svc", "Gone"),
            0x0002_0000,
            crate::event::ResultType::RequestOk,
            1,
        );
        assert!(!router.send_response(event));
        assert_eq!(router.stats().snapshot(), (0, 0, 1));
    }

    #[test]
    fn test_remote_thread_without_transport() {
        let router = ServiceRouter::new();
        router.register_remote_thread("R").expect("remote");
        assert!(!router.is_local_thread("R"));
        let event = NotifyRequestEvent::new(
            ProxyAddress::new(echo(0), "Svc", "C"),
            StubAddress::new(echo(0), "Svc", "R"),
            0x0004_0000,
            crate::event::RequestType::StartNotify,
        );
        assert!(matches!(router.send_notify_request(event), Err(Error::NoTransport)));
    }
}
