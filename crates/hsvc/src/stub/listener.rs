// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server-side listener bookkeeping: pending requests and subscriptions.

use crate::event::{SequenceNumber, SEQUENCE_NUMBER_ANY};
use crate::service::{MessageId, ProxyAddress};

/// One Proxy waiting on a message id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubListener {
    /// Response id for pending requests, attribute/broadcast/response id for
    /// subscriptions, request id for requests without a response.
    pub message_id: MessageId,
    pub proxy: ProxyAddress,
    pub sequence: SequenceNumber,
    /// `true`: awaiting one answer. `false`: standing subscription.
    pub pending: bool,
}

impl StubListener {
    pub fn pending(message_id: MessageId, proxy: ProxyAddress, sequence: SequenceNumber) -> Self {
        Self {
            message_id,
            proxy,
            sequence,
            pending: true,
        }
    }

    pub fn subscription(message_id: MessageId, proxy: ProxyAddress) -> Self {
        Self {
            message_id,
            proxy,
            sequence: SEQUENCE_NUMBER_ANY,
            pending: false,
        }
    }
}

/// Pending requests and subscriptions of one Stub.
#[derive(Debug, Default)]
pub struct StubListenerList {
    entries: Vec<StubListener>,
}

impl StubListenerList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending request unless `proxy` already waits on `id`.
    ///
    /// Returns `false` for the duplicate: at most one request per
    /// (proxy, response id) is in flight.
    pub fn add_pending(&mut self, id: MessageId, proxy: &ProxyAddress, sequence: SequenceNumber) -> bool {
        if self.has_pending(id, proxy) {
            return false;
        }
        self.entries.push(StubListener::pending(id, proxy.clone(), sequence));
        true
    }

    /// Re-insert a listener taken out earlier (deferred responses).
    pub fn restore(&mut self, listener: StubListener) {
        self.entries.push(listener);
    }

    pub fn has_pending(&self, id: MessageId, proxy: &ProxyAddress) -> bool {
        self.entries
            .iter()
            .any(|e| e.pending && e.message_id == id && e.proxy == *proxy)
    }

    /// Remove the pending entry of `proxy` on `id`.
    pub fn remove_pending(&mut self, id: MessageId, proxy: &ProxyAddress) -> Option<StubListener> {
        let index = self
            .entries
            .iter()
            .position(|e| e.pending && e.message_id == id && e.proxy == *proxy)?;
        Some(self.entries.remove(index))
    }

    /// Remove and return every pending entry on `id`.
    pub fn take_pending(&mut self, id: MessageId) -> Vec<StubListener> {
        self.extract(|e| e.pending && e.message_id == id)
    }

    /// Remove and return every pending entry.
    pub fn drain_pending(&mut self) -> Vec<StubListener> {
        self.extract(|e| e.pending)
    }

    /// Add a subscription. Returns `false` if it already exists.
    pub fn add_subscription(&mut self, id: MessageId, proxy: &ProxyAddress) -> bool {
        if self.is_subscribed(id, proxy) {
            return false;
        }
        self.entries.push(StubListener::subscription(id, proxy.clone()));
        true
    }

    pub fn is_subscribed(&self, id: MessageId, proxy: &ProxyAddress) -> bool {
        self.entries
            .iter()
            .any(|e| !e.pending && e.message_id == id && e.proxy == *proxy)
    }

    pub fn remove_subscription(&mut self, id: MessageId, proxy: &ProxyAddress) -> bool {
        !self
            .extract(|e| !e.pending && e.message_id == id && e.proxy == *proxy)
            .is_empty()
    }

    /// Remove every subscription of `proxy`. Returns how many were removed.
    pub fn remove_all_for(&mut self, proxy: &ProxyAddress) -> usize {
        self.extract(|e| !e.pending && e.proxy == *proxy).len()
    }

    /// Proxies subscribed to `id`.
    pub fn subscribers(&self, id: MessageId) -> Vec<ProxyAddress> {
        self.entries
            .iter()
            .filter(|e| !e.pending && e.message_id == id)
            .map(|e| e.proxy.clone())
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.pending).count()
    }

    pub fn subscription_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.pending).count()
    }

    fn extract<F: Fn(&StubListener) -> bool>(&mut self, matches: F) -> Vec<StubListener> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| matches(e));
        self.entries = kept;
        taken
    }
}
