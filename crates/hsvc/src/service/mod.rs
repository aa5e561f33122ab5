// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service addressing.
//!
//! A [`ServiceItem`] names an interface (`name`, [`Version`], [`ServiceKind`]).
//! Binding it to a role gives a [`ServiceAddress`]; binding that to a
//! dispatcher thread gives the [`ProxyAddress`] / [`StubAddress`] used as
//! routing keys.

mod address;
mod interface;
mod item;
mod version;

pub use address::{ProxyAddress, ServiceAddress, StubAddress};
pub use interface::{
    message_kind, InterfaceDescriptor, MessageId, MessageKind, ATTRIBUTE_ID_FIRST,
    BROADCAST_ID_FIRST, INVALID_MESSAGE_ID, REQUEST_ID_FIRST, RESPONSE_ID_FIRST,
};
pub use item::{ServiceItem, ServiceKind};
pub use version::Version;
