// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::error::{Error, Result};
use crate::event::{NotifyRequestEvent, RequestEvent, RequestType, ResponseEvent, ResultType, ServiceEvent};
use crate::runtime::{Envelope, ServiceRouter, ThreadPort};
use crate::service::{
    InterfaceDescriptor, MessageId, ProxyAddress, ServiceItem, ServiceKind, StubAddress, Version,
};
use crate::stream::SharedBuffer;
use crossbeam::channel::{unbounded, Receiver};
use std::sync::Arc;

const REQ_ECHO: MessageId = 0x0001_0001;
const REQ_RESET: MessageId = 0x0001_0002;
const RESP_ECHO: MessageId = 0x0002_0001;
const BC_TICK: MessageId = 0x0003_0001;
const ATTR_COUNT: MessageId = 0x0004_0001;

/// What the handler does with each request.
#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Hold,
    Echo,
    Fail,
    Defer,
    DeferThenFail,
}

struct Recorder {
    mode: Mode,
    calls: Vec<MessageId>,
    sessions: Vec<SessionId>,
}

impl Recorder {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            calls: Vec::new(),
            sessions: Vec::new(),
        }
    }
}

impl StubHandler for Recorder {
    fn on_request(&mut self, stub: &mut Stub, request: MessageId, args: &mut SharedBuffer) -> Result<()> {
        self.calls.push(request);
        match self.mode {
            Mode::Hold => {}
            Mode::Echo => {
                let text: String = args.read()?;
                let mut out = SharedBuffer::new();
                out.write(&text)?;
                stub.send_response(RESP_ECHO, out);
            }
            Mode::Fail => return Err(Error::ComponentFailed("boom".into())),
            Mode::Defer => {
                if let Some(session) = stub.unblock_current_request() {
                    self.sessions.push(session);
                }
            }
            Mode::DeferThenFail => {
                if let Some(session) = stub.unblock_current_request() {
                    self.sessions.push(session);
                }
                return Err(Error::ComponentFailed("failed after unblock".into()));
            }
        }
        Ok(())
    }
}

struct Harness {
    stub: Stub,
    clients: Vec<(ProxyAddress, Receiver<Envelope>)>,
}

fn service() -> ServiceItem {
    ServiceItem::new("Echo", Version::new(1, 0, 0), ServiceKind::Local)
}

fn harness(clients: &[&str]) -> Harness {
    let router = Arc::new(ServiceRouter::new());
    let clients = clients
        .iter()
        .map(|name| {
            let (tx, rx) = unbounded();
            router
                .register_thread(ThreadPort::new(name, tx))
                .expect("client thread");
            (ProxyAddress::new(service(), "Svc", *name), rx)
        })
        .collect();
    let interface = InterfaceDescriptor::new(service())
        .with_request(REQ_ECHO, Some(RESP_ECHO))
        .with_request(REQ_RESET, None)
        .with_broadcast(BC_TICK)
        .with_attribute(ATTR_COUNT);
    let stub = Stub::new(
        StubAddress::new(service(), "Svc", "S"),
        Arc::new(interface),
        router,
    );
    Harness { stub, clients }
}

impl Harness {
    fn request(&self, client: usize, id: MessageId, seq: u64, text: &str) -> RequestEvent {
        let mut args = SharedBuffer::new();
        args.write(&text.to_string()).expect("encode");
        RequestEvent::new(
            self.clients[client].0.clone(),
            self.stub.address().clone(),
            id,
            seq,
            args,
        )
    }

    fn notify(&self, client: usize, id: MessageId, request_type: RequestType) -> NotifyRequestEvent {
        NotifyRequestEvent::new(
            self.clients[client].0.clone(),
            self.stub.address().clone(),
            id,
            request_type,
        )
    }

    fn responses(&self, client: usize) -> Vec<ResponseEvent> {
        self.clients[client]
            .1
            .try_iter()
            .filter_map(|envelope| match envelope {
                Envelope::Event(ServiceEvent::Response(r)) => Some(r),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn test_second_request_from_same_proxy_is_busy() {
    let mut h = harness(&["A", "B"]);
    let mut handler = Recorder::new(Mode::Hold);

    let first = h.request(0, REQ_ECHO, 1, "one");
    h.stub.process_request_event(&mut handler, first);
    let again = h.request(0, REQ_ECHO, 2, "two");
    h.stub.process_request_event(&mut handler, again);
    let other = h.request(1, REQ_ECHO, 1, "three");
    h.stub.process_request_event(&mut handler, other);

    assert_eq!(handler.calls, vec![REQ_ECHO, REQ_ECHO]);
    let busy = h.responses(0);
    assert_eq!(busy.len(), 1);
    assert_eq!(busy[0].result, ResultType::RequestBusy);
    assert_eq!(busy[0].sequence_number, 2);
    assert_eq!(busy[0].message_id, RESP_ECHO);
    assert_eq!(h.stub.listeners().pending_count(), 2);
    assert!(h.stub.current_request().is_none());

    let mut out = SharedBuffer::new();
    out.write(&"done".to_string()).expect("encode");
    assert_eq!(h.stub.send_response(RESP_ECHO, out), 2);
    for client in 0..2 {
        let answers = h.responses(client);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].result, ResultType::RequestOk);
        assert_eq!(answers[0].sequence_number, 1);
    }
    assert_eq!(h.stub.listeners().pending_count(), 0);
}

#[test]
fn test_echo_answers_with_request_sequence() {
    let mut h = harness(&["A"]);
    let mut handler = Recorder::new(Mode::Echo);
    let request = h.request(0, REQ_ECHO, 7, "hi");
    h.stub.process_request_event(&mut handler, request);

    let answers = h.responses(0);
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].sequence_number, 7);
    let mut args = answers[0].args.clone();
    args.rewind();
    assert_eq!(args.read::<String>().expect("decode"), "hi");
}

#[test]
fn test_unknown_request_is_invalid() {
    let mut h = harness(&["A"]);
    let mut handler = Recorder::new(Mode::Echo);
    let bogus = h.request(0, 0x0001_00FF, 3, "x");
    h.stub.process_request_event(&mut handler, bogus);
    let attr_as_request = h.request(0, ATTR_COUNT, 4, "x");
    h.stub.process_request_event(&mut handler, attr_as_request);

    assert!(handler.calls.is_empty());
    let answers = h.responses(0);
    assert_eq!(answers.len(), 2);
    assert!(answers.iter().all(|r| r.result == ResultType::RequestInvalid));
}

#[test]
fn test_handler_error_answers_request_error() {
    let mut h = harness(&["A"]);
    let mut handler = Recorder::new(Mode::Fail);
    let request = h.request(0, REQ_ECHO, 1, "x");
    h.stub.process_request_event(&mut handler, request);
    let no_response = h.request(0, REQ_RESET, 2, "");
    h.stub.process_request_event(&mut handler, no_response);

    let answers = h.responses(0);
    assert_eq!(answers.len(), 2);
    assert_eq!(answers[0].result, ResultType::RequestError);
    assert_eq!(answers[0].message_id, RESP_ECHO);
    assert_eq!(answers[1].result, ResultType::RequestError);
    assert_eq!(answers[1].message_id, REQ_RESET);
    assert_eq!(answers[1].sequence_number, 2);
    assert_eq!(h.stub.listeners().pending_count(), 0);
}

#[test]
fn test_start_notify_pushes_exactly_once() {
    let mut h = harness(&["A", "B"]);
    let start = h.notify(0, ATTR_COUNT, RequestType::StartNotify);
    h.stub.process_attribute_event(start.clone());
    h.stub.process_attribute_event(start);

    let pushed = h.responses(0);
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].result, ResultType::DataInvalid);
    assert_eq!(pushed[0].sequence_number, 0);

    let mut value = SharedBuffer::new();
    value.write(&3u32).expect("encode");
    h.stub.set_attribute(ATTR_COUNT, value, true);
    let updated = h.responses(0);
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].result, ResultType::DataOk);

    let late = h.notify(1, ATTR_COUNT, RequestType::StartNotify);
    h.stub.process_attribute_event(late);
    let pushed = h.responses(1);
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].result, ResultType::DataOk);
    assert!(h.responses(0).is_empty());

    h.stub.invalidate_attribute(ATTR_COUNT);
    assert_eq!(h.responses(0)[0].result, ResultType::DataInvalid);
    assert_eq!(h.responses(1)[0].result, ResultType::DataInvalid);
    assert!(h.stub.attribute(ATTR_COUNT).is_none());
}

#[test]
fn test_subscription_removal() {
    let mut h = harness(&["A"]);
    let start_tick = h.notify(0, BC_TICK, RequestType::StartNotify);
    h.stub.process_attribute_event(start_tick);
    let start_resp = h.notify(0, RESP_ECHO, RequestType::StartNotify);
    h.stub.process_attribute_event(start_resp);
    // Broadcasts and responses have no initial push.
    assert!(h.responses(0).is_empty());
    assert_eq!(h.stub.send_broadcast(BC_TICK, SharedBuffer::new()), 1);

    let stop = h.notify(0, BC_TICK, RequestType::StopNotify);
    h.stub.process_attribute_event(stop);
    assert_eq!(h.stub.send_broadcast(BC_TICK, SharedBuffer::new()), 0);

    let remove_all = h.notify(0, 0, RequestType::RemoveAllNotify);
    h.stub.process_attribute_event(remove_all);
    assert_eq!(h.stub.listeners().subscription_count(), 0);

    let on_request = h.notify(0, REQ_ECHO, RequestType::StartNotify);
    h.stub.process_attribute_event(on_request);
    let answers = h.responses(0);
    assert_eq!(answers.last().map(|r| r.result), Some(ResultType::RequestInvalid));
    assert_eq!(h.stub.listeners().subscription_count(), 0);
}

#[test]
fn test_unlock_all_cancels_each_pending_once() {
    let mut h = harness(&["A", "B", "C"]);
    let mut handler = Recorder::new(Mode::Hold);
    for (client, seq) in [(0, 4), (1, 9), (2, 1)] {
        let request = h.request(client, REQ_ECHO, seq, "x");
        h.stub.process_request_event(&mut handler, request);
    }
    assert_eq!(h.stub.listeners().pending_count(), 3);

    assert_eq!(h.stub.unlock_all_requests(), 3);
    for (client, seq) in [(0, 4), (1, 9), (2, 1)] {
        let answers = h.responses(client);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].result, ResultType::RequestCanceled);
        assert_eq!(answers[0].sequence_number, seq);
    }
    assert_eq!(h.stub.listeners().pending_count(), 0);
    assert_eq!(h.stub.unlock_all_requests(), 0);
}

#[test]
fn test_error_request_cancel_fans_out() {
    let mut h = harness(&["A", "B"]);
    let mut handler = Recorder::new(Mode::Hold);
    for client in 0..2 {
        let request = h.request(client, REQ_ECHO, 5, "x");
        h.stub.process_request_event(&mut handler, request);
    }
    assert_eq!(h.stub.error_request(REQ_ECHO, true), 2);
    for client in 0..2 {
        assert_eq!(h.responses(client)[0].result, ResultType::RequestCanceled);
    }
    assert_eq!(h.stub.error_request(REQ_ECHO, true), 0);
}

#[test]
fn test_deferred_response() {
    let mut h = harness(&["A"]);
    let mut handler = Recorder::new(Mode::Defer);
    let request = h.request(0, REQ_ECHO, 1, "later");
    h.stub.process_request_event(&mut handler, request);

    assert_eq!(handler.sessions.len(), 1);
    assert_eq!(h.stub.session_count(), 1);
    assert_eq!(h.stub.listeners().pending_count(), 0);
    assert!(h.responses(0).is_empty());

    let session = handler.sessions[0];
    assert!(h.stub.prepare_response(session));
    assert!(!h.stub.prepare_response(session));
    assert_eq!(h.stub.send_response(RESP_ECHO, SharedBuffer::new()), 1);
    let answers = h.responses(0);
    assert_eq!(answers[0].result, ResultType::RequestOk);
    assert_eq!(answers[0].sequence_number, 1);
}

#[test]
fn test_deferred_requests_are_canceled_on_unlock() {
    let mut h = harness(&["A"]);
    let mut handler = Recorder::new(Mode::Defer);
    let request = h.request(0, REQ_ECHO, 2, "x");
    h.stub.process_request_event(&mut handler, request);
    assert_eq!(h.stub.unlock_all_requests(), 1);
    assert_eq!(h.responses(0)[0].result, ResultType::RequestCanceled);
    assert_eq!(h.stub.session_count(), 0);
}

#[test]
fn test_error_request_reaches_deferred_sessions() {
    let mut h = harness(&["A", "B"]);
    let mut deferring = Recorder::new(Mode::Defer);
    let mut holding = Recorder::new(Mode::Hold);
    let deferred = h.request(0, REQ_ECHO, 3, "x");
    h.stub.process_request_event(&mut deferring, deferred);
    let held = h.request(1, REQ_ECHO, 8, "y");
    h.stub.process_request_event(&mut holding, held);
    assert_eq!(h.stub.session_count(), 1);
    assert_eq!(h.stub.listeners().pending_count(), 1);

    assert_eq!(h.stub.error_request(REQ_ECHO, true), 2);
    for (client, seq) in [(0, 3), (1, 8)] {
        let answers = h.responses(client);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].result, ResultType::RequestCanceled);
        assert_eq!(answers[0].message_id, RESP_ECHO);
        assert_eq!(answers[0].sequence_number, seq);
    }
    assert_eq!(h.stub.session_count(), 0);
    assert!(!h.stub.prepare_response(deferring.sessions[0]));
    assert_eq!(h.stub.unlock_all_requests(), 0);
}

#[test]
fn test_handler_error_after_unblock_answers_once() {
    let mut h = harness(&["A"]);
    let mut handler = Recorder::new(Mode::DeferThenFail);
    let request = h.request(0, REQ_ECHO, 6, "x");
    h.stub.process_request_event(&mut handler, request);

    assert_eq!(handler.sessions.len(), 1);
    let answers = h.responses(0);
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].result, ResultType::RequestError);
    assert_eq!(answers[0].sequence_number, 6);
    assert_eq!(h.stub.session_count(), 0);
    assert_eq!(h.stub.listeners().pending_count(), 0);
}

#[test]
fn test_error_request_on_response_and_broadcast_invalidates() {
    let mut h = harness(&["A", "B"]);
    let mut handler = Recorder::new(Mode::Hold);
    let request = h.request(0, REQ_ECHO, 2, "x");
    h.stub.process_request_event(&mut handler, request);
    let subscribe = h.notify(1, RESP_ECHO, RequestType::StartNotify);
    h.stub.process_attribute_event(subscribe);

    assert_eq!(h.stub.error_request(RESP_ECHO, false), 2);
    let pending = h.responses(0);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].result, ResultType::DataInvalid);
    assert_eq!(pending[0].sequence_number, 2);
    let subscribed = h.responses(1);
    assert_eq!(subscribed.len(), 1);
    assert_eq!(subscribed[0].result, ResultType::DataInvalid);
    assert_eq!(subscribed[0].sequence_number, 0);
    assert_eq!(h.stub.listeners().pending_count(), 0);

    let tick = h.notify(0, BC_TICK, RequestType::StartNotify);
    h.stub.process_attribute_event(tick);
    assert_eq!(h.stub.error_request(BC_TICK, false), 1);
    let answers = h.responses(0);
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].result, ResultType::DataInvalid);
    assert_eq!(answers[0].message_id, BC_TICK);
}
