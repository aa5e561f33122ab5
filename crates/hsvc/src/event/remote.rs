// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Remote (stream-constructible) event variants.
//!
//! Frame layout: `u32` [`EventTag`] followed by the event's [`Streamable`]
//! encoding. The transport frames and delivers these bytes; it never looks
//! inside.

use super::{ConnectionEvent, NotifyRequestEvent, RequestEvent, ResponseEvent, ServiceEvent};
use crate::stream::{InStream, SharedBuffer, StreamError, StreamResult, Streamable};

/// Frame discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EventTag {
    Request = 1,
    NotifyRequest = 2,
    Response = 3,
    Connection = 4,
}

impl EventTag {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(EventTag::Request),
            2 => Some(EventTag::NotifyRequest),
            3 => Some(EventTag::Response),
            4 => Some(EventTag::Connection),
            _ => None,
        }
    }
}

/// Event that may cross a process boundary.
pub trait WireEvent: Streamable + Clone {
    const TAG: EventTag;

    fn into_service_event(self) -> ServiceEvent;
}

impl WireEvent for RequestEvent {
    const TAG: EventTag = EventTag::Request;

    fn into_service_event(self) -> ServiceEvent {
        ServiceEvent::Request(self)
    }
}

impl WireEvent for NotifyRequestEvent {
    const TAG: EventTag = EventTag::NotifyRequest;

    fn into_service_event(self) -> ServiceEvent {
        ServiceEvent::NotifyRequest(self)
    }
}

impl WireEvent for ResponseEvent {
    const TAG: EventTag = EventTag::Response;

    fn into_service_event(self) -> ServiceEvent {
        ServiceEvent::Response(self)
    }
}

impl WireEvent for ConnectionEvent {
    const TAG: EventTag = EventTag::Connection;

    fn into_service_event(self) -> ServiceEvent {
        ServiceEvent::Connection(self)
    }
}

/// Wire event together with its encoded frame.
#[derive(Debug, Clone)]
pub struct RemoteEvent<E: WireEvent> {
    event: E,
    stream: SharedBuffer,
}

impl<E: WireEvent> RemoteEvent<E> {
    /// Encode `event` into a fresh frame.
    pub fn new(event: E) -> StreamResult<Self> {
        let mut stream = SharedBuffer::new();
        (E::TAG as u32).write_to(&mut stream)?;
        event.write_to(&mut stream)?;
        Ok(Self { event, stream })
    }

    /// Reconstruct from a frame. Fails on a foreign tag or trailing bytes.
    pub fn from_stream(mut stream: SharedBuffer) -> StreamResult<Self> {
        stream.rewind();
        let tag = u32::read_from(&mut stream)?;
        if tag != E::TAG as u32 {
            stream.rewind();
            return Err(StreamError::InvalidData {
                reason: format!("frame tag {} is not {:?}", tag, E::TAG),
            });
        }
        let event = E::read_from(&mut stream)?;
        if stream.remaining() != 0 {
            return Err(StreamError::InvalidData {
                reason: format!("{} trailing bytes after {:?} frame", stream.remaining(), E::TAG),
            });
        }
        stream.rewind();
        Ok(Self { event, stream })
    }

    pub fn event(&self) -> &E {
        &self.event
    }

    /// Encoded frame (read cursor at the start).
    pub fn stream(&self) -> &SharedBuffer {
        &self.stream
    }

    pub fn into_event(self) -> E {
        self.event
    }

    pub fn into_stream(self) -> SharedBuffer {
        self.stream
    }
}

/// Encode a queued event into a frame. Listener notifications are refused.
pub fn encode_event(event: &ServiceEvent) -> StreamResult<SharedBuffer> {
    match event {
        ServiceEvent::Request(e) => RemoteEvent::new(e.clone()).map(RemoteEvent::into_stream),
        ServiceEvent::NotifyRequest(e) => RemoteEvent::new(e.clone()).map(RemoteEvent::into_stream),
        ServiceEvent::Response(e) => RemoteEvent::new(e.clone()).map(RemoteEvent::into_stream),
        ServiceEvent::Connection(e) => RemoteEvent::new(e.clone()).map(RemoteEvent::into_stream),
        ServiceEvent::Notification(_) => Err(StreamError::InvalidData {
            reason: "notification events are process-local".into(),
        }),
    }
}

/// Decode any frame into a queued event.
pub fn decode_frame(mut frame: SharedBuffer) -> StreamResult<ServiceEvent> {
    frame.rewind();
    let tag = u32::read_from(&mut frame)?;
    frame.rewind();
    match EventTag::from_u32(tag) {
        Some(EventTag::Request) => decode_as::<RequestEvent>(frame),
        Some(EventTag::NotifyRequest) => decode_as::<NotifyRequestEvent>(frame),
        Some(EventTag::Response) => decode_as::<ResponseEvent>(frame),
        Some(EventTag::Connection) => decode_as::<ConnectionEvent>(frame),
        None => Err(StreamError::InvalidData {
            reason: format!("unknown frame tag {}", tag),
        }),
    }
}

fn decode_as<E: WireEvent>(frame: SharedBuffer) -> StreamResult<ServiceEvent> {
    RemoteEvent::<E>::from_stream(frame).map(|remote| remote.into_event().into_service_event())
}
