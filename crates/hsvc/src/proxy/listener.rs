// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client-side listener callbacks and the per-Proxy listener table.

use super::Proxy;
use crate::event::{NotificationEvent, SequenceNumber};
use crate::service::MessageId;
use std::collections::HashMap;
use std::fmt;

/// Handle of a listener registered in a [`crate::runtime::ThreadContext`].
///
/// Handles are non-owning: removing the listener leaves stale handles in
/// flight, and notifications addressed to them are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Client object driven by a Proxy on its dispatcher thread.
pub trait ProxyListener {
    /// Stub availability changed. Called once per transition.
    fn on_service_connected(&mut self, _me: ListenerId, _connected: bool, _proxy: &mut Proxy) {}

    /// A response, attribute update or broadcast matched this listener.
    ///
    /// When `event.result` carries data, the value is readable through
    /// [`Proxy::data`] / [`Proxy::read_data`].
    fn on_notification(&mut self, event: &NotificationEvent, proxy: &mut Proxy);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ListenerSlot {
    listener: ListenerId,
    /// `Some` for a one-shot request listener, `None` for a subscription.
    sequence: Option<SequenceNumber>,
}

/// Listener registrations keyed by message id.
#[derive(Debug, Default)]
pub(crate) struct ListenerTable {
    slots: HashMap<MessageId, Vec<ListenerSlot>>,
}

impl ListenerTable {
    /// Listener waiting for the answer to request `sequence`.
    pub(crate) fn add_one_shot(&mut self, id: MessageId, sequence: SequenceNumber, listener: ListenerId) {
        self.slots.entry(id).or_default().push(ListenerSlot {
            listener,
            sequence: Some(sequence),
        });
    }

    /// Standing subscription. Returns `false` if already subscribed.
    pub(crate) fn add_standing(&mut self, id: MessageId, listener: ListenerId) -> bool {
        let slots = self.slots.entry(id).or_default();
        let slot = ListenerSlot {
            listener,
            sequence: None,
        };
        if slots.contains(&slot) {
            return false;
        }
        slots.push(slot);
        true
    }

    pub(crate) fn has_standing(&self, id: MessageId) -> bool {
        self.slots
            .get(&id)
            .is_some_and(|slots| slots.iter().any(|s| s.sequence.is_none()))
    }

    pub(crate) fn is_subscribed(&self, id: MessageId, listener: ListenerId) -> bool {
        self.slots.get(&id).is_some_and(|slots| {
            slots
                .iter()
                .any(|s| s.listener == listener && s.sequence.is_none())
        })
    }

    pub(crate) fn remove_standing(&mut self, id: MessageId, listener: ListenerId) -> bool {
        let Some(slots) = self.slots.get_mut(&id) else {
            return false;
        };
        let before = slots.len();
        slots.retain(|s| !(s.listener == listener && s.sequence.is_none()));
        let removed = slots.len() != before;
        self.prune(id);
        removed
    }

    /// Drop every slot of `listener`. Returns the ids it was subscribed to.
    pub(crate) fn remove_listener(&mut self, listener: ListenerId) -> Vec<MessageId> {
        let mut subscribed = Vec::new();
        for (id, slots) in &mut self.slots {
            if slots
                .iter()
                .any(|s| s.listener == listener && s.sequence.is_none())
            {
                subscribed.push(*id);
            }
            slots.retain(|s| s.listener != listener);
        }
        self.slots.retain(|_, slots| !slots.is_empty());
        subscribed.sort_unstable();
        subscribed
    }

    /// Listeners matching a response: every subscription on `id`, plus the
    /// one-shot listeners of `sequence`, which are consumed.
    pub(crate) fn take_matches(&mut self, id: MessageId, sequence: SequenceNumber) -> Vec<ListenerId> {
        let Some(slots) = self.slots.get_mut(&id) else {
            return Vec::new();
        };
        let matched = slots
            .iter()
            .filter(|s| s.sequence.is_none() || s.sequence == Some(sequence))
            .map(|s| s.listener)
            .collect();
        slots.retain(|s| s.sequence.is_none() || s.sequence != Some(sequence));
        self.prune(id);
        matched
    }

    /// Drop every one-shot listener. Returns how many were dropped.
    pub(crate) fn drop_one_shots(&mut self) -> usize {
        let mut dropped = 0;
        for slots in self.slots.values_mut() {
            let before = slots.len();
            slots.retain(|s| s.sequence.is_none());
            dropped += before - slots.len();
        }
        self.slots.retain(|_, slots| !slots.is_empty());
        dropped
    }

    /// Ids with at least one subscription, sorted.
    pub(crate) fn standing_ids(&self) -> Vec<MessageId> {
        let mut ids: Vec<_> = self
            .slots
            .iter()
            .filter(|(_, slots)| slots.iter().any(|s| s.sequence.is_none()))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    fn prune(&mut self, id: MessageId) {
        if self.slots.get(&id).is_some_and(Vec::is_empty) {
            self.slots.remove(&id);
        }
    }
}
