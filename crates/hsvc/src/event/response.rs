// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stub -> Proxy events and the in-process listener notification.

use super::{ResultType, SequenceNumber};
use crate::proxy::ListenerId;
use crate::service::{MessageId, ProxyAddress};
use crate::stream::{
    read_atomically, write_atomically, InStream, OutStream, SharedBuffer, StreamResult,
    Streamable,
};

/// Answer, attribute update or broadcast delivered to one Proxy.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEvent {
    pub target: ProxyAddress,
    pub message_id: MessageId,
    pub result: ResultType,
    pub sequence_number: SequenceNumber,
    pub args: SharedBuffer,
}

impl ResponseEvent {
    pub fn new(
        target: ProxyAddress,
        message_id: MessageId,
        result: ResultType,
        sequence_number: SequenceNumber,
        args: SharedBuffer,
    ) -> Self {
        Self {
            target,
            message_id,
            result,
            sequence_number,
            args,
        }
    }

    /// Response without arguments (error and state-only results).
    pub fn without_data(
        target: ProxyAddress,
        message_id: MessageId,
        result: ResultType,
        sequence_number: SequenceNumber,
    ) -> Self {
        Self::new(target, message_id, result, sequence_number, SharedBuffer::new())
    }

    /// Same payload for another Proxy. The argument storage is shared.
    pub fn clone_for_target(&self, target: ProxyAddress) -> Self {
        Self {
            target,
            message_id: self.message_id,
            result: self.result,
            sequence_number: self.sequence_number,
            args: self.args.clone(),
        }
    }

    /// Arguments, only when the result carries data.
    pub fn data(&self) -> Option<&SharedBuffer> {
        self.result.carries_data().then_some(&self.args)
    }
}

impl Streamable for ResponseEvent {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        write_atomically(out, |out| {
            self.target.write_to(out)?;
            self.message_id.write_to(out)?;
            self.result.write_to(out)?;
            self.sequence_number.write_to(out)?;
            self.args.write_to(out)
        })
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        read_atomically(input, |input| {
            Ok(ResponseEvent::new(
                ProxyAddress::read_from(input)?,
                MessageId::read_from(input)?,
                ResultType::read_from(input)?,
                SequenceNumber::read_from(input)?,
                SharedBuffer::read_from(input)?,
            ))
        })
    }
}

/// Decoded outcome handed to one listener on the Proxy's thread.
///
/// Never serialized. The value itself stays in the Proxy cache; read it with
/// [`crate::proxy::Proxy::data`] when `result` carries data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub proxy: ProxyAddress,
    pub listener: ListenerId,
    pub result: ResultType,
    pub message_id: MessageId,
    pub sequence_number: SequenceNumber,
}

impl NotificationEvent {
    pub fn new(
        proxy: ProxyAddress,
        listener: ListenerId,
        result: ResultType,
        message_id: MessageId,
        sequence_number: SequenceNumber,
    ) -> Self {
        Self {
            proxy,
            listener,
            result,
            message_id,
            sequence_number,
        }
    }
}
