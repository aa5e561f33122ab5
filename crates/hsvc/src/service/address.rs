// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint addresses: a service item bound to a role, and a role bound to a
//! dispatcher thread.
//!
//! Path forms:
//! - `ServiceAddress`: `Echo::1.0.0::1::Svc`
//! - `ProxyAddress` / `StubAddress`: `Echo::1.0.0::1::Svc::T`

use super::item::is_path_segment;
use super::ServiceItem;
use crate::config::PATH_SEPARATOR;
use crate::error::{Error, Result};
use crate::stream::{
    read_atomically, read_string, write_atomically, write_string, InStream, OutStream,
    StreamResult, Streamable,
};
use std::fmt;
use std::str::FromStr;

/// Service item implemented or consumed under a role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ServiceAddress {
    service: ServiceItem,
    role: String,
}

impl ServiceAddress {
    pub fn new(service: ServiceItem, role: impl Into<String>) -> Self {
        Self {
            service,
            role: role.into(),
        }
    }

    #[inline]
    pub fn service(&self) -> &ServiceItem {
        &self.service
    }

    #[inline]
    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn is_valid(&self) -> bool {
        self.service.is_valid() && is_path_segment(&self.role)
    }

    pub fn to_path(&self) -> String {
        format!("{}{}{}", self.service.to_path(), PATH_SEPARATOR, self.role)
    }

    /// Parse the leading address of `path`, returning the unparsed rest.
    pub fn parse(path: &str) -> Result<(ServiceAddress, &str)> {
        let (service, rest) = ServiceItem::parse(path)?;
        let (role, remainder) = rest.split_once(PATH_SEPARATOR).unwrap_or((rest, ""));
        if role.is_empty() {
            return Err(Error::InvalidAddress(path.to_string()));
        }
        Ok((ServiceAddress::new(service, role), remainder))
    }
}


impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

impl FromStr for ServiceAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match ServiceAddress::parse(s)? {
            (address, "") => Ok(address),
            _ => Err(Error::InvalidAddress(s.to_string())),
        }
    }
}

impl Streamable for ServiceAddress {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        write_atomically(out, |out| {
            self.service.write_to(out)?;
            write_string(out, &self.role)
        })
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        read_atomically(input, |input| {
            let service = ServiceItem::read_from(input)?;
            let role = read_string(input)?;
            Ok(ServiceAddress::new(service, role))
        })
    }
}

/// Generate a thread-bound endpoint address type.
macro_rules! endpoint_address {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
        pub struct $name {
            address: ServiceAddress,
            thread: String,
        }

        impl $name {
            pub fn new(service: ServiceItem, role: impl Into<String>, thread: impl Into<String>) -> Self {
                Self {
                    address: ServiceAddress::new(service, role),
                    thread: thread.into(),
                }
            }

            pub fn from_address(address: ServiceAddress, thread: impl Into<String>) -> Self {
                Self {
                    address,
                    thread: thread.into(),
                }
            }

            #[inline]
            pub fn address(&self) -> &ServiceAddress {
                &self.address
            }

            #[inline]
            pub fn service(&self) -> &ServiceItem {
                self.address.service()
            }

            #[inline]
            pub fn role(&self) -> &str {
                self.address.role()
            }

            /// Name of the owning dispatcher thread.
            #[inline]
            pub fn thread(&self) -> &str {
                &self.thread
            }

            pub fn is_valid(&self) -> bool {
                self.address.is_valid() && is_path_segment(&self.thread)
            }

            pub fn to_path(&self) -> String {
                format!("{}{}{}", self.address.to_path(), PATH_SEPARATOR, self.thread)
            }

            pub fn parse(path: &str) -> Result<($name, &str)> {
                let (address, rest) = ServiceAddress::parse(path)?;
                let (thread, remainder) = rest.split_once(PATH_SEPARATOR).unwrap_or((rest, ""));
                if thread.is_empty() {
                    return Err(Error::InvalidAddress(path.to_string()));
                }
                Ok(($name::from_address(address, thread), remainder))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_path())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match $name::parse(s)? {
                    (address, "") => Ok(address),
                    _ => Err(Error::InvalidAddress(s.to_string())),
                }
            }
        }

        impl Streamable for $name {
            fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
                write_atomically(out, |out| {
                    self.address.write_to(out)?;
                    write_string(out, &self.thread)
                })
            }

            fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
                read_atomically(input, |input| {
                    let address = ServiceAddress::read_from(input)?;
                    let thread = read_string(input)?;
                    Ok($name::from_address(address, thread))
                })
            }
        }
    };
}

endpoint_address!(
    /// Client endpoint: where responses and notifications are delivered.
    ProxyAddress
);

endpoint_address!(
    /// Server endpoint: where requests are delivered.
    StubAddress
);

impl StubAddress {
    /// True if requests from `proxy` route to this stub.
    pub fn accepts(&self, proxy: &ProxyAddress) -> bool {
        self.role() == proxy.role() && self.service().is_compatible(proxy.service())
    }
}
