// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message ids and the per-interface request/response table.
//!
//! Generated interface code builds one [`InterfaceDescriptor`] per service and
//! shares it (`Arc`) between every Proxy and Stub of that service.

use super::ServiceItem;
use std::collections::HashMap;

/// Message identifier inside one service interface.
pub type MessageId = u32;

/// Never a valid message.
pub const INVALID_MESSAGE_ID: MessageId = 0;

/// First request id.
pub const REQUEST_ID_FIRST: MessageId = 0x0001_0000;
/// First response id.
pub const RESPONSE_ID_FIRST: MessageId = 0x0002_0000;
/// First broadcast id.
pub const BROADCAST_ID_FIRST: MessageId = 0x0003_0000;
/// First attribute id.
pub const ATTRIBUTE_ID_FIRST: MessageId = 0x0004_0000;

const ID_RANGE_MASK: MessageId = 0xFFFF_0000;

/// Category of a message id, derived from its numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Request,
    Response,
    Broadcast,
    Attribute,
    Unknown,
}

/// Classify `id` by range.
#[inline]
#[must_use]
pub fn message_kind(id: MessageId) -> MessageKind {
    match id & ID_RANGE_MASK {
        REQUEST_ID_FIRST => MessageKind::Request,
        RESPONSE_ID_FIRST => MessageKind::Response,
        BROADCAST_ID_FIRST => MessageKind::Broadcast,
        ATTRIBUTE_ID_FIRST => MessageKind::Attribute,
        _ => MessageKind::Unknown,
    }
}

/// Static description of one service interface.
#[derive(Debug, Clone)]
pub struct InterfaceDescriptor {
    service: ServiceItem,
    /// Request id -> response id (`None` for fire-and-forget requests).
    requests: HashMap<MessageId, Option<MessageId>>,
    /// Response id -> originating request id.
    responses: HashMap<MessageId, Option<MessageId>>,
    broadcasts: Vec<MessageId>,
    attributes: Vec<MessageId>,
}

impl InterfaceDescriptor {
    pub fn new(service: ServiceItem) -> Self {
        Self {
            service,
            requests: HashMap::new(),
            responses: HashMap::new(),
            broadcasts: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Declare a request, optionally paired with its response.
    #[must_use]
    pub fn with_request(mut self, request: MessageId, response: Option<MessageId>) -> Self {
        debug_assert_eq!(message_kind(request), MessageKind::Request);
        self.requests.insert(request, response);
        if let Some(response) = response {
            debug_assert_eq!(message_kind(response), MessageKind::Response);
            self.responses.insert(response, Some(request));
        }
        self
    }

    /// Declare a response not tied to any request (pure notification).
    #[must_use]
    pub fn with_response(mut self, response: MessageId) -> Self {
        debug_assert_eq!(message_kind(response), MessageKind::Response);
        self.responses.entry(response).or_insert(None);
        self
    }

    #[must_use]
    pub fn with_broadcast(mut self, broadcast: MessageId) -> Self {
        debug_assert_eq!(message_kind(broadcast), MessageKind::Broadcast);
        if !self.broadcasts.contains(&broadcast) {
            self.broadcasts.push(broadcast);
        }
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, attribute: MessageId) -> Self {
        debug_assert_eq!(message_kind(attribute), MessageKind::Attribute);
        if !self.attributes.contains(&attribute) {
            self.attributes.push(attribute);
        }
        self
    }

    #[inline]
    pub fn service(&self) -> &ServiceItem {
        &self.service
    }

    /// Response paired with `request`.
    pub fn response_for(&self, request: MessageId) -> Option<MessageId> {
        self.requests.get(&request).copied().flatten()
    }

    /// Request that `response` answers.
    pub fn request_for(&self, response: MessageId) -> Option<MessageId> {
        self.responses.get(&response).copied().flatten()
    }

    /// Declared kind of `id`, or `Unknown` if the interface does not know it.
    pub fn kind_of(&self, id: MessageId) -> MessageKind {
        if self.has_message(id) {
            message_kind(id)
        } else {
            MessageKind::Unknown
        }
    }

    pub fn has_message(&self, id: MessageId) -> bool {
        match message_kind(id) {
            MessageKind::Request => self.requests.contains_key(&id),
            MessageKind::Response => self.responses.contains_key(&id),
            MessageKind::Broadcast => self.broadcasts.contains(&id),
            MessageKind::Attribute => self.attributes.contains(&id),
            MessageKind::Unknown => false,
        }
    }

    /// Declared attribute ids.
    pub fn attributes(&self) -> &[MessageId] {
        &self.attributes
    }
}
