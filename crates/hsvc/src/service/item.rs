// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service identity: name, version, kind.

use super::Version;
use crate::config::{INVALID_SERVICE_NAME, PATH_SEPARATOR, SERVICE_NAME_MAX_LEN};
use crate::error::{Error, Result};
use crate::stream::{
    read_atomically, read_string, write_atomically, write_string, InStream, OutStream,
    StreamResult, Streamable,
};
use std::fmt;
use std::str::FromStr;

/// Visibility of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum ServiceKind {
    /// Unknown or undecodable kind. Never valid.
    #[default]
    Invalid = 0,
    /// Reachable from the same process only.
    Local = 1,
    /// Reachable from other processes through a transport.
    Public = 2,
}

impl ServiceKind {
    /// Decode a wire value. Unknown values map to [`ServiceKind::Invalid`].
    #[inline]
    #[must_use]
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => ServiceKind::Local,
            2 => ServiceKind::Public,
            _ => ServiceKind::Invalid,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    #[inline]
    #[must_use]
    pub fn is_valid(self) -> bool {
        self != ServiceKind::Invalid
    }
}

/// Identity of a service interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ServiceItem {
    name: String,
    version: Version,
    kind: ServiceKind,
}

impl ServiceItem {
    pub fn new(name: impl Into<String>, version: Version, kind: ServiceKind) -> Self {
        Self {
            name: name.into(),
            version,
            kind,
        }
    }

    /// Item carrying the reserved invalid name.
    pub fn invalid() -> Self {
        Self::new(INVALID_SERVICE_NAME, Version::invalid(), ServiceKind::Invalid)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    #[inline]
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn is_valid(&self) -> bool {
        is_path_segment(&self.name)
            && self.name != INVALID_SERVICE_NAME
            && self.name.len() <= SERVICE_NAME_MAX_LEN
            && self.kind.is_valid()
            && self.version.is_valid()
    }

    /// True if a provider of `self` can serve a consumer of `other`.
    pub fn is_compatible(&self, other: &ServiceItem) -> bool {
        self.is_valid()
            && other.is_valid()
            && self.name == other.name
            && self.kind == other.kind
            && self.version.is_compatible(&other.version)
    }

    /// `name::major.minor.patch::kind`
    pub fn to_path(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.name,
            self.version,
            self.kind.as_u32(),
            sep = PATH_SEPARATOR
        )
    }

    /// Parse the leading item of `path` and return it with the unparsed rest.
    ///
    /// The remainder starts after the separator that follows the kind field,
    /// or is empty. A kind value that is not a known enumerator yields an
    /// item with [`ServiceKind::Invalid`]; a missing or malformed name or
    /// version is an error.
    pub fn parse(path: &str) -> Result<(ServiceItem, &str)> {
        let bad = || Error::InvalidAddress(path.to_string());

        let (name, rest) = path.split_once(PATH_SEPARATOR).ok_or_else(bad)?;
        let (version, rest) = rest.split_once(PATH_SEPARATOR).ok_or_else(bad)?;
        let (kind, remainder) = rest.split_once(PATH_SEPARATOR).unwrap_or((rest, ""));

        if name.is_empty() {
            return Err(bad());
        }
        let version = Version::parse(version).ok_or_else(bad)?;
        let kind = kind
            .parse::<u32>()
            .map(ServiceKind::from_u32)
            .unwrap_or(ServiceKind::Invalid);

        Ok((ServiceItem::new(name, version, kind), remainder))
    }
}

/// True if `segment` survives a join with [`PATH_SEPARATOR`] and a split
/// back: non-empty, no separator inside, and no trailing `:` that would merge
/// with the next separator.
pub(super) fn is_path_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains(PATH_SEPARATOR) && !segment.ends_with(':')
}

impl fmt::Display for ServiceItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

impl FromStr for ServiceItem {
    type Err = Error;

    /// Parse a complete item path. Trailing fields are an error.
    fn from_str(s: &str) -> Result<Self> {
        match ServiceItem::parse(s)? {
            (item, "") => Ok(item),
            _ => Err(Error::InvalidAddress(s.to_string())),
        }
    }
}

impl Streamable for ServiceItem {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        write_atomically(out, |out| {
            write_string(out, &self.name)?;
            self.version.write_to(out)?;
            self.kind.as_u32().write_to(out)
        })
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        read_atomically(input, |input| {
            let name = read_string(input)?;
            let version = Version::read_from(input)?;
            let kind = ServiceKind::from_u32(u32::read_from(input)?);
            Ok(ServiceItem::new(name, version, kind))
        })
    }
}
