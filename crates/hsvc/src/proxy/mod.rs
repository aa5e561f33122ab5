// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client-side runtime.
//!
//! A [`Proxy`] sends requests to the Stub serving its role, caches the last
//! value of every response, attribute and broadcast with a validity flag, and
//! fans results out to [`ProxyListener`]s as notification events.
//!
//! # Response classification
//!
//! | Result | Id | Effect |
//! |--------|----|--------|
//! | `RequestOk` / `DataOk` | response, attribute, broadcast | cache value, mark valid |
//! | error / cancel | any | mark invalid (value kept), response id resolves to its request id |
//! | `NotProcessed`, or data on a request or unknown id | - | ignored |
//!
//! Proxies live in a [`crate::runtime::ThreadContext`]; create them with
//! [`crate::runtime::ThreadContext::attach_proxy`].

mod endpoint;
mod listener;

pub use endpoint::Proxy;
pub use listener::{ListenerId, ProxyListener};

#[cfg(test)]
mod tests;
