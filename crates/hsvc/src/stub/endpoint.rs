// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server-side endpoint of one service role.

use super::listener::{StubListener, StubListenerList};
use crate::error::Result;
use crate::event::{
    NotifyRequestEvent, RequestEvent, RequestType, ResponseEvent, ResultType, SequenceNumber,
    SEQUENCE_NUMBER_ANY,
};
use crate::runtime::ServiceRouter;
use crate::service::{InterfaceDescriptor, MessageId, MessageKind, ProxyAddress, StubAddress};
use crate::stream::SharedBuffer;
use std::collections::HashMap;
use std::sync::Arc;

/// Handle of a request whose answer was deferred with
/// [`Stub::unblock_current_request`].
pub type SessionId = u64;

/// Service implementation behind a [`Stub`].
pub trait StubHandler {
    /// Execute `request`. `args` is rewound to the first argument.
    ///
    /// Answer with [`Stub::send_response`] now, or defer with
    /// [`Stub::unblock_current_request`]. Returning `Err` answers every
    /// pending listener of the request with `RequestError`.
    fn on_request(&mut self, stub: &mut Stub, request: MessageId, args: &mut SharedBuffer) -> Result<()>;

    /// Stub registered; a good place to set initial attribute values.
    fn on_startup(&mut self, _stub: &mut Stub) {}

    /// Stub about to leave the router. Pending requests are already canceled.
    fn on_shutdown(&mut self, _stub: &mut Stub) {}
}

/// Server-side endpoint.
///
/// Owned by the dispatcher thread that hosts its component. Every method
/// runs on that thread.
pub struct Stub {
    address: StubAddress,
    interface: Arc<InterfaceDescriptor>,
    listeners: StubListenerList,
    attributes: HashMap<MessageId, SharedBuffer>,
    current: Option<StubListener>,
    sessions: HashMap<SessionId, StubListener>,
    next_session: SessionId,
    router: Arc<ServiceRouter>,
}

impl Stub {
    pub(crate) fn new(
        address: StubAddress,
        interface: Arc<InterfaceDescriptor>,
        router: Arc<ServiceRouter>,
    ) -> Self {
        Self {
            address,
            interface,
            listeners: StubListenerList::new(),
            attributes: HashMap::new(),
            current: None,
            sessions: HashMap::new(),
            next_session: 0,
            router,
        }
    }

    pub fn address(&self) -> &StubAddress {
        &self.address
    }

    pub fn interface(&self) -> &InterfaceDescriptor {
        &self.interface
    }

    pub fn listeners(&self) -> &StubListenerList {
        &self.listeners
    }

    /// Request being executed, if any.
    pub fn current_request(&self) -> Option<&StubListener> {
        self.current.as_ref()
    }

    /// Deferred requests not yet answered.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    // ========================================================================
    // Incoming events
    // ========================================================================

    /// Execute one request through `handler`.
    ///
    /// Unknown ids are answered `RequestInvalid`. A second request from the
    /// same Proxy while its first is unanswered is answered `RequestBusy` and
    /// not executed.
    pub fn process_request_event(&mut self, handler: &mut dyn StubHandler, event: RequestEvent) {
        let RequestEvent {
            source,
            message_id,
            sequence_number,
            mut args,
            ..
        } = event;

        if self.interface.kind_of(message_id) != MessageKind::Request {
            log::warn!(
                "[stub] {} unknown request {:#x} from {}",
                self.address,
                message_id,
                source
            );
            self.reply(source, message_id, ResultType::RequestInvalid, sequence_number);
            return;
        }

        let response = self.interface.response_for(message_id);
        let key = response.unwrap_or(message_id);
        if !self.can_execute_request(&source, key, sequence_number, response.is_some()) {
            log::debug!(
                "[stub] {} busy: {} already waits on {:#x}, seq {} rejected",
                self.address,
                source,
                key,
                sequence_number
            );
            self.reply(source, key, ResultType::RequestBusy, sequence_number);
            return;
        }

        self.current = Some(StubListener {
            message_id: key,
            proxy: source,
            sequence: sequence_number,
            pending: response.is_some(),
        });

        args.rewind();
        if let Err(e) = handler.on_request(self, message_id, &mut args) {
            log::warn!("[stub] {} request {:#x} failed: {}", self.address, message_id, e);
            self.error_request(message_id, false);
        }
        self.cancel_current_request();
    }

    /// Apply a subscription change.
    ///
    /// `StartNotify` on an attribute pushes its current state to the new
    /// subscriber exactly once; repeating it is a no-op.
    pub fn process_attribute_event(&mut self, event: NotifyRequestEvent) {
        let NotifyRequestEvent {
            source,
            message_id,
            request_type,
            ..
        } = event;

        match request_type {
            RequestType::StartNotify => {
                let kind = self.interface.kind_of(message_id);
                if matches!(kind, MessageKind::Request | MessageKind::Unknown) {
                    log::warn!(
                        "[stub] {} cannot subscribe {} to {:#x}",
                        self.address,
                        source,
                        message_id
                    );
                    self.reply(source, message_id, ResultType::RequestInvalid, SEQUENCE_NUMBER_ANY);
                    return;
                }
                if !self.listeners.add_subscription(message_id, &source) {
                    return;
                }
                if kind == MessageKind::Attribute {
                    let (result, args) = self.attribute_state(message_id);
                    self.router.send_response(ResponseEvent::new(
                        source,
                        message_id,
                        result,
                        SEQUENCE_NUMBER_ANY,
                        args,
                    ));
                }
            }
            RequestType::StopNotify => {
                self.listeners.remove_subscription(message_id, &source);
            }
            RequestType::RemoveAllNotify => {
                let removed = self.listeners.remove_all_for(&source);
                log::debug!("[stub] {} removed {} subscription(s) of {}", self.address, removed, source);
            }
            RequestType::CallFunction => {
                log::warn!(
                    "[stub] {} function call {:#x} from {} sent as notify request, ignored",
                    self.address,
                    message_id,
                    source
                );
            }
        }
    }

    // ========================================================================
    // Outgoing: responses, attributes, broadcasts
    // ========================================================================

    /// Answer every Proxy waiting on `response` and every subscriber of it.
    ///
    /// Returns the number of responses sent.
    pub fn send_response(&mut self, response: MessageId, args: SharedBuffer) -> usize {
        let pending = self.listeners.take_pending(response);
        let mut sent = 0;
        for listener in &pending {
            let event = ResponseEvent::new(
                listener.proxy.clone(),
                response,
                ResultType::RequestOk,
                listener.sequence,
                args.clone(),
            );
            sent += usize::from(self.router.send_response(event));
        }
        for proxy in self.listeners.subscribers(response) {
            if pending.iter().any(|p| p.proxy == proxy) {
                continue;
            }
            let event = ResponseEvent::new(
                proxy,
                response,
                ResultType::RequestOk,
                SEQUENCE_NUMBER_ANY,
                args.clone(),
            );
            sent += usize::from(self.router.send_response(event));
        }
        sent
    }

    /// Push `args` to every subscriber of broadcast `id`.
    pub fn send_broadcast(&mut self, id: MessageId, args: SharedBuffer) -> usize {
        self.push_to_subscribers(id, ResultType::DataOk, &args)
    }

    /// Store a new attribute value, optionally notifying subscribers.
    pub fn set_attribute(&mut self, id: MessageId, value: SharedBuffer, notify: bool) {
        self.attributes.insert(id, value);
        if notify {
            self.send_notification(id);
        }
    }

    /// Drop the value of `id` and tell subscribers it is invalid.
    pub fn invalidate_attribute(&mut self, id: MessageId) {
        self.attributes.remove(&id);
        self.send_notification(id);
    }

    pub fn attribute(&self, id: MessageId) -> Option<&SharedBuffer> {
        self.attributes.get(&id)
    }

    /// Push the current state of attribute `id` to every subscriber.
    ///
    /// Returns the number of notifications sent; zero subscribers is fine.
    pub fn send_notification(&mut self, id: MessageId) -> usize {
        let (result, args) = self.attribute_state(id);
        self.push_to_subscribers(id, result, &args)
    }

    // ========================================================================
    // Errors and cancellation
    // ========================================================================

    /// Fail `id` towards its listeners.
    ///
    /// - attribute: invalidated, subscribers get `DataInvalid`
    /// - response / broadcast: listeners get `DataInvalid`
    /// - request: every Proxy pending on its response, deferred sessions
    ///   included, gets `RequestCanceled` (`is_cancel`) or `RequestError`; a
    ///   request without response answers the current requester
    ///
    /// Returns the number of listeners answered.
    pub fn error_request(&mut self, id: MessageId, is_cancel: bool) -> usize {
        match self.interface.kind_of(id) {
            MessageKind::Attribute => {
                self.attributes.remove(&id);
                self.push_to_subscribers(id, ResultType::DataInvalid, &SharedBuffer::new())
            }
            MessageKind::Response | MessageKind::Broadcast => {
                let waiting = self.take_waiting(id);
                let sent = waiting.len();
                for listener in waiting {
                    self.reply(listener.proxy, id, ResultType::DataInvalid, listener.sequence);
                }
                sent + self.push_to_subscribers(id, ResultType::DataInvalid, &SharedBuffer::new())
            }
            MessageKind::Request => {
                let result = if is_cancel {
                    ResultType::RequestCanceled
                } else {
                    ResultType::RequestError
                };
                match self.interface.response_for(id) {
                    Some(response) => {
                        let waiting = self.take_waiting(response);
                        let count = waiting.len();
                        for listener in waiting {
                            self.reply(listener.proxy, response, result, listener.sequence);
                        }
                        count
                    }
                    None => match &self.current {
                        Some(current) if current.message_id == id => {
                            let (proxy, sequence) = (current.proxy.clone(), current.sequence);
                            self.reply(proxy, id, result, sequence);
                            1
                        }
                        _ => 0,
                    },
                }
            }
            MessageKind::Unknown => {
                log::warn!("[stub] {} error_request on unknown id {:#x}", self.address, id);
                0
            }
        }
    }

    /// Cancel every unanswered request, deferred ones included.
    ///
    /// Each waiting (proxy, response) pair receives exactly one
    /// `RequestCanceled` carrying its own sequence number.
    pub fn unlock_all_requests(&mut self) -> usize {
        let mut waiting = self.listeners.drain_pending();
        let mut deferred: Vec<_> = self.sessions.drain().collect();
        deferred.sort_unstable_by_key(|(session, _)| *session);
        waiting.extend(deferred.into_iter().map(|(_, listener)| listener));

        let count = waiting.len();
        for listener in waiting {
            self.reply(
                listener.proxy,
                listener.message_id,
                ResultType::RequestCanceled,
                listener.sequence,
            );
        }
        if count > 0 {
            log::debug!("[stub] {} canceled {} pending request(s)", self.address, count);
        }
        count
    }

    // ========================================================================
    // Deferred answers
    // ========================================================================

    /// Detach the current request so the handler can answer later.
    ///
    /// The requester is no longer considered busy. Returns `None` outside a
    /// request or for requests without a response.
    pub fn unblock_current_request(&mut self) -> Option<SessionId> {
        let current = self.current.as_ref().filter(|c| c.pending)?;
        let listener = self
            .listeners
            .remove_pending(current.message_id, &current.proxy)?;
        self.next_session += 1;
        let session = self.next_session;
        self.sessions.insert(session, listener);
        Some(session)
    }

    /// Re-arm a deferred request so the next [`send_response`] reaches it.
    ///
    /// Returns `false` for an unknown or already answered session.
    ///
    /// [`send_response`]: Stub::send_response
    pub fn prepare_response(&mut self, session: SessionId) -> bool {
        match self.sessions.remove(&session) {
            Some(listener) => {
                self.listeners.restore(listener);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Single-flight gate: `false` if `proxy` already waits on `response`.
    fn can_execute_request(
        &mut self,
        proxy: &ProxyAddress,
        response: MessageId,
        sequence: SequenceNumber,
        tracked: bool,
    ) -> bool {
        !tracked || self.listeners.add_pending(response, proxy, sequence)
    }

    /// Pending listeners of `response` followed by its deferred sessions,
    /// oldest first. All of them leave the stub.
    fn take_waiting(&mut self, response: MessageId) -> Vec<StubListener> {
        let mut waiting = self.listeners.take_pending(response);
        let mut deferred: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, listener)| listener.message_id == response)
            .map(|(session, _)| *session)
            .collect();
        deferred.sort_unstable();
        waiting.extend(deferred.into_iter().filter_map(|session| self.sessions.remove(&session)));
        waiting
    }

    fn cancel_current_request(&mut self) {
        self.current = None;
    }

    fn attribute_state(&self, id: MessageId) -> (ResultType, SharedBuffer) {
        match self.attributes.get(&id) {
            Some(value) => (ResultType::DataOk, value.clone()),
            None => (ResultType::DataInvalid, SharedBuffer::new()),
        }
    }

    fn push_to_subscribers(&self, id: MessageId, result: ResultType, args: &SharedBuffer) -> usize {
        self.listeners
            .subscribers(id)
            .into_iter()
            .map(|proxy| {
                let event = ResponseEvent::new(proxy, id, result, SEQUENCE_NUMBER_ANY, args.clone());
                usize::from(self.router.send_response(event))
            })
            .sum()
    }

    fn reply(&self, target: ProxyAddress, id: MessageId, result: ResultType, sequence: SequenceNumber) {
        self.router
            .send_response(ResponseEvent::without_data(target, id, result, sequence));
    }
}

impl std::fmt::Debug for Stub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stub")
            .field("address", &self.address)
            .field("pending", &self.listeners.pending_count())
            .field("subscriptions", &self.listeners.subscription_count())
            .field("attributes", &self.attributes.len())
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
