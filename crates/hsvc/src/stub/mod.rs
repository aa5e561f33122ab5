// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server-side runtime.
//!
//! A [`Stub`] receives requests for one role, enforces at most one request in
//! flight per (proxy, response id), keeps attribute values and their
//! subscribers, and turns every failure into exactly one terminal response per
//! waiting listener.
//!
//! Stubs live in a [`crate::runtime::ThreadContext`]; register them with
//! [`crate::runtime::ThreadContext::register_stub`].

mod endpoint;
mod listener;

pub use endpoint::{SessionId, Stub, StubHandler};
pub use listener::{StubListener, StubListenerList};

#[cfg(test)]
mod tests;
