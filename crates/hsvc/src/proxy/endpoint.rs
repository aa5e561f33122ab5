// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client-side endpoint of one service role on one dispatcher thread.

use super::listener::{ListenerId, ListenerTable};
use crate::event::{
    NotificationEvent, NotifyRequestEvent, RequestEvent, RequestType, ResponseEvent, ResultType,
    SequenceNumber, ServiceEvent, SEQUENCE_NUMBER_ANY,
};
use crate::runtime::ServiceRouter;
use crate::service::{InterfaceDescriptor, MessageId, MessageKind, ProxyAddress, StubAddress};
use crate::stream::{SharedBuffer, Streamable};
use std::collections::HashMap;
use std::sync::Arc;

/// Last known value of a response, attribute or broadcast.
#[derive(Debug, Clone, Default)]
struct CachedValue {
    value: SharedBuffer,
    valid: bool,
}

/// How a response affects the Proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    /// Decodable value: cache it as valid.
    Data,
    /// Error or cancel: invalidate, keep the stored bytes.
    StateOnly,
    /// `NotProcessed`, or data on a request or unknown id.
    Ignore,
}

/// Client-side endpoint.
///
/// One instance per (role, thread), shared by every attached client of that
/// thread. All methods run on the owning dispatcher thread; outgoing events go
/// through the [`ServiceRouter`], listener notifications are queued back to
/// this thread and dispatched after the current event completes.
pub struct Proxy {
    address: ProxyAddress,
    interface: Arc<InterfaceDescriptor>,
    stub: Option<StubAddress>,
    sequence: SequenceNumber,
    listeners: ListenerTable,
    clients: Vec<ListenerId>,
    state: HashMap<MessageId, CachedValue>,
    router: Arc<ServiceRouter>,
}

impl Proxy {
    pub(crate) fn new(
        address: ProxyAddress,
        interface: Arc<InterfaceDescriptor>,
        router: Arc<ServiceRouter>,
    ) -> Self {
        Self {
            address,
            interface,
            stub: None,
            sequence: SEQUENCE_NUMBER_ANY,
            listeners: ListenerTable::default(),
            clients: Vec::new(),
            state: HashMap::new(),
            router,
        }
    }

    pub fn address(&self) -> &ProxyAddress {
        &self.address
    }

    pub fn interface(&self) -> &InterfaceDescriptor {
        &self.interface
    }

    /// Stub currently serving this Proxy.
    pub fn stub_address(&self) -> Option<&StubAddress> {
        self.stub.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.stub.is_some()
    }

    /// Last allocated sequence number.
    pub fn last_sequence(&self) -> SequenceNumber {
        self.sequence
    }

    /// Attached clients, in attach order.
    pub fn clients(&self) -> &[ListenerId] {
        &self.clients
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Send `request` with encoded `args`.
    ///
    /// `listener` is notified once with the outcome: the response on success,
    /// or an error result. Without a connected stub the request is answered
    /// locally with [`ResultType::MessageUndelivered`].
    pub fn send_request(
        &mut self,
        request: MessageId,
        args: SharedBuffer,
        listener: Option<ListenerId>,
    ) -> SequenceNumber {
        self.sequence += 1;
        let sequence = self.sequence;
        let key = self.listen_key(request);
        if let Some(listener) = listener {
            self.listeners.add_one_shot(key, sequence, listener);
        }

        let delivered = match &self.stub {
            Some(stub) => {
                let event =
                    RequestEvent::new(self.address.clone(), stub.clone(), request, sequence, args);
                match self.router.send_request(event) {
                    Ok(()) => true,
                    Err(e) => {
                        log::warn!("[proxy] {} request {:#x} seq {}: {}", self.address, request, sequence, e);
                        false
                    }
                }
            }
            None => false,
        };

        if !delivered {
            log::debug!(
                "[proxy] {} request {:#x} seq {} undelivered",
                self.address,
                request,
                sequence
            );
            let bounce = ResponseEvent::without_data(
                self.address.clone(),
                key,
                ResultType::MessageUndelivered,
                sequence,
            );
            self.process_response(bounce);
        }
        sequence
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Subscribe `listener` to updates of `id`.
    ///
    /// The first subscriber asks the stub to start notifying (now, or on
    /// connection). With `notify_now` a valid cached value is delivered
    /// immediately.
    pub fn set_notification(&mut self, id: MessageId, listener: ListenerId, notify_now: bool) {
        let first = !self.listeners.has_standing(id);
        if !self.listeners.add_standing(id, listener) {
            return;
        }
        if first {
            self.send_notify_request(id, RequestType::StartNotify);
        }
        if notify_now && self.is_data_valid(id) {
            let result = self.data_result(id);
            self.post_notification(listener, result, id, SEQUENCE_NUMBER_ANY);
        }
    }

    /// Remove one subscription. The last subscriber stops the stub updates.
    pub fn clear_notification(&mut self, id: MessageId, listener: ListenerId) {
        if self.listeners.remove_standing(id, listener) && !self.listeners.has_standing(id) {
            self.stop_tracking(id);
        }
    }

    /// Remove every registration of `listener`, subscriptions and pending
    /// request listeners alike.
    pub fn clear_all_notifications(&mut self, listener: ListenerId) {
        for id in self.listeners.remove_listener(listener) {
            if !self.listeners.has_standing(id) {
                self.stop_tracking(id);
            }
        }
    }

    pub fn is_notification_set(&self, id: MessageId, listener: ListenerId) -> bool {
        self.listeners.is_subscribed(id, listener)
    }

    pub fn has_notification(&self, id: MessageId) -> bool {
        self.listeners.has_standing(id)
    }

    fn stop_tracking(&mut self, id: MessageId) {
        if self.interface.kind_of(id) == MessageKind::Attribute {
            if let Some(cached) = self.state.get_mut(&id) {
                cached.valid = false;
            }
        }
        self.send_notify_request(id, RequestType::StopNotify);
    }

    fn send_notify_request(&self, id: MessageId, request_type: RequestType) {
        let Some(stub) = &self.stub else {
            return;
        };
        let event = NotifyRequestEvent::new(self.address.clone(), stub.clone(), id, request_type);
        if let Err(e) = self.router.send_notify_request(event) {
            log::warn!("[proxy] {} {:?} {:#x}: {}", self.address, request_type, id, e);
        }
    }

    // ========================================================================
    // Responses
    // ========================================================================

    /// Apply a response from the stub and notify matching listeners.
    ///
    /// Returns the number of notifications queued.
    pub fn process_response(&mut self, event: ResponseEvent) -> usize {
        let id = event.message_id;
        let kind = self.interface.kind_of(id);

        let classification = match (event.result, kind) {
            (ResultType::NotProcessed, _) => Classification::Ignore,
            (result, MessageKind::Request | MessageKind::Unknown) if result.carries_data() => {
                Classification::Ignore
            }
            (result, _) if result.carries_data() => Classification::Data,
            _ => Classification::StateOnly,
        };

        let notify_id = match classification {
            Classification::Ignore => {
                log::debug!(
                    "[proxy] {} ignored {:?} for {:#x}",
                    self.address,
                    event.result,
                    id
                );
                return 0;
            }
            Classification::Data => {
                self.state.insert(
                    id,
                    CachedValue {
                        value: event.args,
                        valid: true,
                    },
                );
                id
            }
            Classification::StateOnly => {
                if let Some(cached) = self.state.get_mut(&id) {
                    cached.valid = false;
                }
                match kind {
                    MessageKind::Response => self.interface.request_for(id).unwrap_or(id),
                    _ => id,
                }
            }
        };

        let key = self.listen_key(id);
        let matched = self.listeners.take_matches(key, event.sequence_number);
        for listener in &matched {
            self.post_notification(*listener, event.result, notify_id, event.sequence_number);
        }
        matched.len()
    }

    /// Stub availability changed. Returns `true` on an actual transition.
    ///
    /// On connection every standing subscription is re-requested. On
    /// disconnection cached values become invalid and pending request
    /// listeners are dropped; subscriptions are kept for the next connection.
    pub fn service_connected(&mut self, connected: bool, stub: &StubAddress) -> bool {
        match (connected, &self.stub) {
            (true, Some(current)) if current == stub => false,
            (true, _) => {
                log::debug!("[proxy] {} connected to {}", self.address, stub);
                self.stub = Some(stub.clone());
                for id in self.listeners.standing_ids() {
                    self.send_notify_request(id, RequestType::StartNotify);
                }
                true
            }
            (false, Some(current)) if current == stub => {
                log::debug!("[proxy] {} disconnected from {}", self.address, stub);
                self.stub = None;
                for cached in self.state.values_mut() {
                    cached.valid = false;
                }
                let dropped = self.listeners.drop_one_shots();
                if dropped > 0 {
                    log::debug!("[proxy] {} dropped {} pending listener(s)", self.address, dropped);
                }
                true
            }
            (false, _) => false,
        }
    }

    // ========================================================================
    // Cached state
    // ========================================================================

    /// Cached value of `id` if valid.
    pub fn data(&self, id: MessageId) -> Option<&SharedBuffer> {
        self.state
            .get(&id)
            .filter(|cached| cached.valid)
            .map(|cached| &cached.value)
    }

    pub fn is_data_valid(&self, id: MessageId) -> bool {
        self.data(id).is_some()
    }

    /// Decode the first value of the cached arguments of `id`.
    pub fn read_data<T: Streamable>(&self, id: MessageId) -> Option<T> {
        let mut buffer = self.data(id)?.clone();
        buffer.rewind();
        match buffer.read::<T>() {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("[proxy] {} cannot decode {:#x}: {}", self.address, id, e);
                None
            }
        }
    }

    // ========================================================================
    // Clients
    // ========================================================================

    /// Returns `false` if already attached.
    pub(crate) fn attach_client(&mut self, listener: ListenerId) -> bool {
        if self.clients.contains(&listener) {
            return false;
        }
        self.clients.push(listener);
        true
    }

    /// Detach and drop all registrations of `listener`. Returns the number of
    /// remaining clients.
    pub(crate) fn detach_client(&mut self, listener: ListenerId) -> usize {
        self.clear_all_notifications(listener);
        self.clients.retain(|client| *client != listener);
        self.clients.len()
    }

    /// Unsubscribe everything at the stub and leave the router.
    pub(crate) fn shutdown(&mut self) {
        self.send_notify_request(crate::service::INVALID_MESSAGE_ID, RequestType::RemoveAllNotify);
        self.router.unregister_proxy(&self.address);
        self.stub = None;
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Listener table key of `id`: requests are tracked by their response.
    fn listen_key(&self, id: MessageId) -> MessageId {
        match self.interface.kind_of(id) {
            MessageKind::Request => self.interface.response_for(id).unwrap_or(id),
            _ => id,
        }
    }

    fn data_result(&self, id: MessageId) -> ResultType {
        match self.interface.kind_of(id) {
            MessageKind::Response => ResultType::RequestOk,
            _ => ResultType::DataOk,
        }
    }

    fn post_notification(
        &self,
        listener: ListenerId,
        result: ResultType,
        id: MessageId,
        sequence: SequenceNumber,
    ) {
        let event = NotificationEvent::new(self.address.clone(), listener, result, id, sequence);
        if let Err(e) = self.router.post_event(ServiceEvent::Notification(event)) {
            log::warn!("[proxy] {} notification for {} lost: {}", self.address, listener, e);
        }
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("address", &self.address)
            .field("connected", &self.is_connected())
            .field("sequence", &self.sequence)
            .field("clients", &self.clients.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
