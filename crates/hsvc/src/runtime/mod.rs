// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Threads, routing and model lifecycle.
//!
//! # Architecture
//!
//! ```text
//! ModelRuntime ──spawns──> DispatcherThread ──owns──> ThreadContext
//!      │                        │                       ├── Stubs (+ handlers)
//!      │                        │                       ├── Proxies (+ listeners)
//!      │                        │                       ├── Components
//!      │                        │                       └── WorkerThreads
//!      └────── shares ──> ServiceRouter <── ThreadPort (inbox per thread)
//!                               └── Transport (remote threads)
//! ```
//!
//! Cross-thread delivery only ever enqueues; Stub and Proxy state is touched
//! solely by the owning dispatcher thread.

mod context;
mod dispatcher;
mod models;
mod router;
mod worker;

pub use context::ThreadContext;
pub use dispatcher::{DispatcherThread, Heartbeat, ThreadPort, ThreadTask};
pub use models::ModelRuntime;
pub use router::{RouterStats, ServiceRouter, Transport};
pub use worker::{WorkerConsumer, WorkerMessage, WorkerThread};

#[cfg(test)]
pub(crate) use dispatcher::Envelope;
