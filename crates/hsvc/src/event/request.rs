// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Proxy -> Stub events.

use super::{RequestType, SequenceNumber};
use crate::service::{MessageId, ProxyAddress, StubAddress};
use crate::stream::{
    read_atomically, write_atomically, InStream, OutStream, SharedBuffer, StreamResult,
    Streamable,
};

/// Function call addressed to one Stub.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEvent {
    pub source: ProxyAddress,
    pub target: StubAddress,
    pub message_id: MessageId,
    pub sequence_number: SequenceNumber,
    /// Encoded arguments in declaration order.
    pub args: SharedBuffer,
}

impl RequestEvent {
    pub fn new(
        source: ProxyAddress,
        target: StubAddress,
        message_id: MessageId,
        sequence_number: SequenceNumber,
        args: SharedBuffer,
    ) -> Self {
        Self {
            source,
            target,
            message_id,
            sequence_number,
            args,
        }
    }
}

impl Streamable for RequestEvent {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        write_atomically(out, |out| {
            self.source.write_to(out)?;
            self.target.write_to(out)?;
            self.message_id.write_to(out)?;
            self.sequence_number.write_to(out)?;
            self.args.write_to(out)
        })
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        read_atomically(input, |input| {
            Ok(RequestEvent::new(
                ProxyAddress::read_from(input)?,
                StubAddress::read_from(input)?,
                MessageId::read_from(input)?,
                SequenceNumber::read_from(input)?,
                SharedBuffer::read_from(input)?,
            ))
        })
    }
}

/// Subscription management addressed to one Stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyRequestEvent {
    pub source: ProxyAddress,
    pub target: StubAddress,
    pub message_id: MessageId,
    pub request_type: RequestType,
}

impl NotifyRequestEvent {
    pub fn new(
        source: ProxyAddress,
        target: StubAddress,
        message_id: MessageId,
        request_type: RequestType,
    ) -> Self {
        Self {
            source,
            target,
            message_id,
            request_type,
        }
    }
}

impl Streamable for NotifyRequestEvent {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        write_atomically(out, |out| {
            self.source.write_to(out)?;
            self.target.write_to(out)?;
            self.message_id.write_to(out)?;
            self.request_type.write_to(out)
        })
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        read_atomically(input, |input| {
            Ok(NotifyRequestEvent::new(
                ProxyAddress::read_from(input)?,
                StubAddress::read_from(input)?,
                MessageId::read_from(input)?,
                RequestType::read_from(input)?,
            ))
        })
    }
}
