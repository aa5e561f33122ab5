// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hsvc - location-transparent service messaging
//!
//! Components call each other through **Proxies** (client side) and **Stubs**
//! (server side) that exchange request, response, attribute and broadcast
//! events. Each component runs on a cooperative dispatcher thread; the same
//! calls work whether the peer lives on the same thread, another thread, or
//! another process behind a [`runtime::Transport`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hsvc::component::{Component, ComponentEntry, ComponentFactory, ComponentThreadEntry, Model};
//! use hsvc::runtime::{ModelRuntime, ThreadContext};
//! use hsvc::service::{InterfaceDescriptor, MessageId, ServiceItem, ServiceKind, Version};
//! use hsvc::stream::SharedBuffer;
//! use hsvc::stub::{Stub, StubHandler};
//! use hsvc::Result;
//! use std::sync::Arc;
//!
//! const REQ_ECHO: MessageId = 0x0001_0001;
//! const RESP_ECHO: MessageId = 0x0002_0001;
//!
//! struct Echo;
//!
//! impl StubHandler for Echo {
//!     fn on_request(&mut self, stub: &mut Stub, _req: MessageId, args: &mut SharedBuffer) -> Result<()> {
//!         let text: String = args.read()?;
//!         let mut out = SharedBuffer::new();
//!         out.write(&text)?;
//!         stub.send_response(RESP_ECHO, out);
//!         Ok(())
//!     }
//! }
//!
//! struct EchoService;
//!
//! impl Component for EchoService {
//!     fn startup(&mut self, ctx: &mut ThreadContext) -> Result<()> {
//!         let service = ServiceItem::new("Echo", Version::new(1, 0, 0), ServiceKind::Local);
//!         let interface = InterfaceDescriptor::new(service).with_request(REQ_ECHO, Some(RESP_ECHO));
//!         ctx.register_stub(Arc::new(interface), "Svc", Box::new(Echo))?;
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let mut model = Model::new("M");
//!     model
//!         .add_thread_or_get(ComponentThreadEntry::new("T", None))
//!         .add_component(ComponentEntry::new(
//!             "T",
//!             "Svc",
//!             ComponentFactory::from_fn(|_| Ok(Box::new(EchoService))),
//!         ));
//!
//!     let runtime = ModelRuntime::default();
//!     runtime.load_model(model)?;
//!     runtime.unload_model("M")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                     Components (Model / registry)                  |
//! +---------------------------------------------------------------------+
//! |        Proxy (client cache, listeners)  |  Stub (busy gate, attrs) |
//! +---------------------------------------------------------------------+
//! |   Events: Request | NotifyRequest | Response | Connection | Notify |
//! +---------------------------------------------------------------------+
//! |   Dispatcher threads + ServiceRouter  |  Transport (remote frames) |
//! +---------------------------------------------------------------------+
//! |                Stream codec (SharedBuffer, BufferView)             |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`stream`] - byte stream codec
//! - [`service`] - service items, addresses, interface descriptors
//! - [`component`] - deployment model registry (+ YAML loader)
//! - [`event`] - message events and their wire form
//! - [`proxy`] / [`stub`] - client and server endpoints
//! - [`runtime`] - dispatcher threads, router, model lifecycle

/// Deployment model registry: models, threads, components, factories.
pub mod component;
/// Constants and runtime settings.
pub mod config;
/// Crate error type.
pub mod error;
/// Request, response, notification and connection events.
pub mod event;
/// Client-side endpoint.
pub mod proxy;
/// Dispatcher threads, event routing and model lifecycle.
pub mod runtime;
/// Service naming, versions, addresses and interface descriptors.
pub mod service;
/// Byte stream codec.
pub mod stream;
/// Server-side endpoint.
pub mod stub;

pub use error::{Error, Result};
pub use event::{ResultType, SequenceNumber, ServiceEvent};
pub use proxy::{ListenerId, Proxy, ProxyListener};
pub use runtime::{ModelRuntime, ServiceRouter, ThreadContext};
pub use service::{InterfaceDescriptor, MessageId, ProxyAddress, ServiceItem, StubAddress, Version};
pub use stream::{SharedBuffer, Streamable};
pub use stub::{Stub, StubHandler};

/// hsvc version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
