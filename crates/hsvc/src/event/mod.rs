// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message events exchanged between Proxies and Stubs.
//!
//! | Event | Direction | Wire |
//! |-------|-----------|------|
//! | [`RequestEvent`] | Proxy -> Stub | yes |
//! | [`NotifyRequestEvent`] | Proxy -> Stub | yes |
//! | [`ResponseEvent`] | Stub -> Proxy | yes |
//! | [`ConnectionEvent`] | router -> Proxy | yes |
//! | [`NotificationEvent`] | Proxy -> its listener | never |
//!
//! Local events are the plain structs, moved through dispatcher queues as a
//! [`ServiceEvent`]. [`RemoteEvent`] pairs a wire event with its encoded
//! frame for transports.

mod remote;
mod request;
mod response;

pub use remote::{decode_frame, encode_event, EventTag, RemoteEvent, WireEvent};
pub use request::{NotifyRequestEvent, RequestEvent};
pub use response::{NotificationEvent, ResponseEvent};

use crate::service::{ProxyAddress, StubAddress};
use crate::stream::{
    read_atomically, write_atomically, InStream, OutStream, StreamError, StreamResult, Streamable,
};

/// Per-Proxy request counter value.
pub type SequenceNumber = u64;

/// Sequence number of pushes not tied to a request (subscriptions).
pub const SEQUENCE_NUMBER_ANY: SequenceNumber = 0;

/// Outcome carried by responses and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ResultType {
    /// Request executed, response arguments valid.
    RequestOk = 0,
    /// Attribute or broadcast value valid.
    DataOk = 1,
    /// Attribute or broadcast value not available.
    DataInvalid = 2,
    /// Handler failed.
    RequestError = 3,
    /// Same requester already has this request in flight.
    RequestBusy = 4,
    /// Request canceled by the stub.
    RequestCanceled = 5,
    /// Message id unknown to the stub.
    RequestInvalid = 6,
    /// Target unreachable.
    MessageUndelivered = 7,
    /// Not handled; consumers ignore it.
    NotProcessed = 8,
}

impl ResultType {
    /// Decode a wire value. Unknown values map to `NotProcessed`.
    #[must_use]
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => ResultType::RequestOk,
            1 => ResultType::DataOk,
            2 => ResultType::DataInvalid,
            3 => ResultType::RequestError,
            4 => ResultType::RequestBusy,
            5 => ResultType::RequestCanceled,
            6 => ResultType::RequestInvalid,
            7 => ResultType::MessageUndelivered,
            _ => ResultType::NotProcessed,
        }
    }

    /// Only these results carry decodable argument data.
    #[inline]
    #[must_use]
    pub fn carries_data(self) -> bool {
        matches!(self, ResultType::RequestOk | ResultType::DataOk)
    }

    #[inline]
    #[must_use]
    pub fn is_error(self) -> bool {
        !self.carries_data() && self != ResultType::NotProcessed
    }
}

impl Streamable for ResultType {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        (*self as u32).write_to(out)
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        u32::read_from(input).map(ResultType::from_u32)
    }
}

/// Kind of a [`NotifyRequestEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RequestType {
    CallFunction = 0,
    StartNotify = 1,
    StopNotify = 2,
    RemoveAllNotify = 3,
}

impl RequestType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(RequestType::CallFunction),
            1 => Some(RequestType::StartNotify),
            2 => Some(RequestType::StopNotify),
            3 => Some(RequestType::RemoveAllNotify),
            _ => None,
        }
    }
}

impl Streamable for RequestType {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        (*self as u32).write_to(out)
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        read_atomically(input, |input| {
            let value = u32::read_from(input)?;
            RequestType::from_u32(value).ok_or_else(|| StreamError::InvalidData {
                reason: format!("unknown request type {}", value),
            })
        })
    }
}

/// Stub availability change for one Proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub proxy: ProxyAddress,
    pub stub: StubAddress,
    pub connected: bool,
}

impl ConnectionEvent {
    pub fn new(proxy: ProxyAddress, stub: StubAddress, connected: bool) -> Self {
        Self {
            proxy,
            stub,
            connected,
        }
    }
}

impl Streamable for ConnectionEvent {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        write_atomically(out, |out| {
            self.proxy.write_to(out)?;
            self.stub.write_to(out)?;
            self.connected.write_to(out)
        })
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        read_atomically(input, |input| {
            Ok(ConnectionEvent::new(
                ProxyAddress::read_from(input)?,
                StubAddress::read_from(input)?,
                bool::read_from(input)?,
            ))
        })
    }
}

/// Dispatcher queue envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    Request(RequestEvent),
    NotifyRequest(NotifyRequestEvent),
    Response(ResponseEvent),
    Notification(NotificationEvent),
    Connection(ConnectionEvent),
}

impl ServiceEvent {
    /// Dispatcher thread that must process this event.
    pub fn target_thread(&self) -> &str {
        match self {
            ServiceEvent::Request(e) => e.target.thread(),
            ServiceEvent::NotifyRequest(e) => e.target.thread(),
            ServiceEvent::Response(e) => e.target.thread(),
            ServiceEvent::Notification(e) => e.proxy.thread(),
            ServiceEvent::Connection(e) => e.proxy.thread(),
        }
    }

    /// Short name for logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ServiceEvent::Request(_) => "request",
            ServiceEvent::NotifyRequest(_) => "notify-request",
            ServiceEvent::Response(_) => "response",
            ServiceEvent::Notification(_) => "notification",
            ServiceEvent::Connection(_) => "connection",
        }
    }
}
