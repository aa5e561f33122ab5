// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::event::{
    NotificationEvent, NotifyRequestEvent, RequestType, ResponseEvent, ResultType, ServiceEvent,
};
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

const L1: ListenerId = ListenerId::new(1);
const L2: ListenerId = ListenerId::new(2);

struct Harness {
    proxy: Proxy,
    stub: StubAddress,
    client_rx: Receiver<Envelope>,
    stub_rx: Receiver<Envelope>,
}

fn echo_service() -> ServiceItem {
    ServiceItem::new("Echo", Version::new(1, 0, 0), ServiceKind::Local)
}

fn harness() -> Harness {
    let router = Arc::new(ServiceRouter::new());
    let (client_tx, client_rx) = unbounded();
    let (stub_tx, stub_rx) = unbounded();
    router
        .register_thread(ThreadPort::new("C", client_tx))
        .expect("client thread");
    router
        .register_thread(ThreadPort::new("S", stub_tx))
        .expect("stub thread");

    let interface = InterfaceDescriptor::new(echo_service())
        .with_request(REQ_ECHO, Some(RESP_ECHO))
        .with_request(REQ_RESET, None)
        .with_broadcast(BC_TICK)
        .with_attribute(ATTR_COUNT);
    let proxy = Proxy::new(
        ProxyAddress::new(echo_service(), "Svc", "C"),
        Arc::new(interface),
        router,
    );
    Harness {
        proxy,
        stub: StubAddress::new(echo_service(), "Svc", "S"),
        client_rx,
        stub_rx,
    }
}

fn text(value: &str) -> SharedBuffer {
    let mut buf = SharedBuffer::new();
    buf.write(&value.to_string()).expect("encode");
    buf
}

fn notifications(rx: &Receiver<Envelope>) -> Vec<NotificationEvent> {
    rx.try_iter()
        .filter_map(|envelope| match envelope {
            Envelope::Event(ServiceEvent::Notification(n)) => Some(n),
            _ => None,
        })
        .collect()
}

fn notify_requests(rx: &Receiver<Envelope>) -> Vec<NotifyRequestEvent> {
    rx.try_iter()
        .filter_map(|envelope| match envelope {
            Envelope::Event(ServiceEvent::NotifyRequest(n)) => Some(n),
            _ => None,
        })
        .collect()
}

impl Harness {
    fn response(&self, id: MessageId, result: ResultType, seq: u64, args: SharedBuffer) -> ResponseEvent {
        ResponseEvent::new(self.proxy.address().clone(), id, result, seq, args)
    }
}

#[test]
fn test_request_before_connection_is_undelivered() {
    let mut h = harness();
    let seq = h.proxy.send_request(REQ_ECHO, text("hi"), Some(L1));
    assert_eq!(seq, 1);

    let seen = notifications(&h.client_rx);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].listener, L1);
    assert_eq!(seen[0].result, ResultType::MessageUndelivered);
    assert_eq!(seen[0].message_id, REQ_ECHO);
    assert_eq!(seen[0].sequence_number, 1);
    assert!(h.stub_rx.try_recv().is_err());
}

#[test]
fn test_response_caches_value_and_consumes_listener() {
    let mut h = harness();
    assert!(h.proxy.service_connected(true, &h.stub.clone()));
    let seq = h.proxy.send_request(REQ_ECHO, text("hi"), Some(L1));

    match h.stub_rx.try_recv().expect("request routed") {
        Envelope::Event(ServiceEvent::Request(r)) => {
            assert_eq!(r.message_id, REQ_ECHO);
            assert_eq!(r.sequence_number, seq);
            assert_eq!(r.target, h.stub);
        }
        other => panic!("unexpected {:?}", other),
    }

    let event = h.response(RESP_ECHO, ResultType::RequestOk, seq, text("hi"));
    assert_eq!(h.proxy.process_response(event.clone()), 1);
    assert_eq!(h.proxy.read_data::<String>(RESP_ECHO).as_deref(), Some("hi"));

    let seen = notifications(&h.client_rx);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].result, ResultType::RequestOk);
    assert_eq!(seen[0].message_id, RESP_ECHO);

    // Same answer again: value cached, nobody left to notify.
    assert_eq!(h.proxy.process_response(event), 0);
}

#[test]
fn test_error_resolves_to_request_and_invalidates() {
    let mut h = harness();
    h.proxy.service_connected(true, &h.stub.clone());
    let first = h.proxy.send_request(REQ_ECHO, text("a"), None);
    h.proxy
        .process_response(h.response(RESP_ECHO, ResultType::RequestOk, first, text("a")));
    assert!(h.proxy.is_data_valid(RESP_ECHO));

    let second = h.proxy.send_request(REQ_ECHO, text("b"), Some(L1));
    let canceled = h.response(RESP_ECHO, ResultType::RequestCanceled, second, SharedBuffer::new());
    assert_eq!(h.proxy.process_response(canceled), 1);
    assert!(!h.proxy.is_data_valid(RESP_ECHO));

    let seen = notifications(&h.client_rx);
    assert_eq!(seen[0].message_id, REQ_ECHO);
    assert_eq!(seen[0].result, ResultType::RequestCanceled);
    assert_eq!(seen[0].sequence_number, second);
}

#[test]
fn test_ignored_responses() {
    let mut h = harness();
    h.proxy.service_connected(true, &h.stub.clone());
    h.proxy.send_request(REQ_RESET, SharedBuffer::new(), Some(L1));

    let data_on_request = h.response(REQ_RESET, ResultType::RequestOk, 1, SharedBuffer::new());
    assert_eq!(h.proxy.process_response(data_on_request), 0);
    let unknown = h.response(0x0002_00FF, ResultType::DataOk, 0, SharedBuffer::new());
    assert_eq!(h.proxy.process_response(unknown), 0);
    let not_processed = h.response(RESP_ECHO, ResultType::NotProcessed, 1, SharedBuffer::new());
    assert_eq!(h.proxy.process_response(not_processed), 0);

    // An error on the request itself still reaches its listener.
    let failed = h.response(REQ_RESET, ResultType::RequestError, 1, SharedBuffer::new());
    assert_eq!(h.proxy.process_response(failed), 1);
}

#[test]
fn test_first_and_last_subscriber_drive_stub() {
    let mut h = harness();
    h.proxy.service_connected(true, &h.stub.clone());

    h.proxy.set_notification(ATTR_COUNT, L1, false);
    h.proxy.set_notification(ATTR_COUNT, L2, false);
    h.proxy.set_notification(ATTR_COUNT, L2, false);
    let sent = notify_requests(&h.stub_rx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].request_type, RequestType::StartNotify);

    let mut value = SharedBuffer::new();
    value.write(&5u32).expect("encode");
    let update = h.response(ATTR_COUNT, ResultType::DataOk, 0, value);
    assert_eq!(h.proxy.process_response(update), 2);
    assert_eq!(h.proxy.read_data::<u32>(ATTR_COUNT), Some(5));

    h.proxy.clear_notification(ATTR_COUNT, L1);
    assert!(notify_requests(&h.stub_rx).is_empty());
    assert!(h.proxy.is_data_valid(ATTR_COUNT));

    h.proxy.clear_notification(ATTR_COUNT, L2);
    let sent = notify_requests(&h.stub_rx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].request_type, RequestType::StopNotify);
    assert!(!h.proxy.is_data_valid(ATTR_COUNT));
    assert!(!h.proxy.has_notification(ATTR_COUNT));
}

#[test]
fn test_notify_now_delivers_cached_value() {
    let mut h = harness();
    h.proxy.service_connected(true, &h.stub.clone());
    h.proxy.set_notification(BC_TICK, L1, false);
    h.proxy
        .process_response(h.response(BC_TICK, ResultType::DataOk, 0, text("tick")));
    let _ = notifications(&h.client_rx);

    h.proxy.set_notification(BC_TICK, L2, true);
    let seen = notifications(&h.client_rx);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].listener, L2);
    assert_eq!(seen[0].result, ResultType::DataOk);
}

#[test]
fn test_disconnect_keeps_subscriptions_for_reconnect() {
    let mut h = harness();
    let stub = h.stub.clone();
    h.proxy.service_connected(true, &stub);
    h.proxy.set_notification(ATTR_COUNT, L1, false);
    h.proxy.send_request(REQ_ECHO, text("x"), Some(L2));
    h.proxy
        .process_response(h.response(ATTR_COUNT, ResultType::DataOk, 0, text("v")));
    let _ = h.stub_rx.try_iter().count();

    assert!(h.proxy.service_connected(false, &stub));
    assert!(!h.proxy.service_connected(false, &stub));
    assert!(!h.proxy.is_connected());
    assert!(!h.proxy.is_data_valid(ATTR_COUNT));

    // The pending answer of the old connection no longer finds L2.
    let stale = h.response(RESP_ECHO, ResultType::RequestOk, 1, text("x"));
    let _ = notifications(&h.client_rx);
    assert_eq!(h.proxy.process_response(stale), 0);

    assert!(h.proxy.service_connected(true, &stub));
    let sent = notify_requests(&h.stub_rx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message_id, ATTR_COUNT);
    assert_eq!(sent[0].request_type, RequestType::StartNotify);
}

#[test]
fn test_clear_all_notifications_for_listener() {
    let mut h = harness();
    h.proxy.service_connected(true, &h.stub.clone());
    assert!(h.proxy.attach_client(L1));
    assert!(!h.proxy.attach_client(L1));
    h.proxy.attach_client(L2);
    h.proxy.set_notification(ATTR_COUNT, L1, false);
    h.proxy.set_notification(BC_TICK, L1, false);
    h.proxy.set_notification(BC_TICK, L2, false);
    let _ = h.stub_rx.try_iter().count();

    assert_eq!(h.proxy.detach_client(L1), 1);
    let stopped: Vec<MessageId> = notify_requests(&h.stub_rx)
        .into_iter()
        .filter(|n| n.request_type == RequestType::StopNotify)
        .map(|n| n.message_id)
        .collect();
    assert_eq!(stopped, vec![ATTR_COUNT]);
    assert!(h.proxy.is_notification_set(BC_TICK, L2));
    assert_eq!(h.proxy.clients(), &[L2]);
}
