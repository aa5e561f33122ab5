// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service interface version and its compatibility rule.

use crate::error::Error;
use crate::stream::{read_atomically, write_atomically, InStream, OutStream, StreamResult, Streamable};
use std::fmt;
use std::str::FromStr;

/// `major.minor.patch` version of a service interface.
///
/// `0.0.0` is the invalid version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    #[inline]
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The invalid version `0.0.0`.
    #[inline]
    #[must_use]
    pub const fn invalid() -> Self {
        Self::new(0, 0, 0)
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        *self != Self::invalid()
    }

    /// True if a provider at `self` can serve a consumer built against `other`.
    ///
    /// Same major, and at least the consumer's minor. Patch is ignored.
    #[inline]
    #[must_use]
    pub fn is_compatible(&self, other: &Version) -> bool {
        self.is_valid()
            && other.is_valid()
            && self.major == other.major
            && self.minor >= other.minor
    }

    /// Parse `major.minor.patch`. Returns `None` on any malformed component.
    pub fn parse(text: &str) -> Option<Version> {
        let mut parts = text.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Version::new(major, minor, patch))
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s).ok_or_else(|| Error::InvalidVersion(s.to_string()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Streamable for Version {
    fn write_to<W: OutStream + ?Sized>(&self, out: &mut W) -> StreamResult<()> {
        write_atomically(out, |out| {
            self.major.write_to(out)?;
            self.minor.write_to(out)?;
            self.patch.write_to(out)
        })
    }

    fn read_from<R: InStream + ?Sized>(input: &mut R) -> StreamResult<Self> {
        read_atomically(input, |input| {
            Ok(Version::new(
                u32::read_from(input)?,
                u32::read_from(input)?,
                u32::read_from(input)?,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility_rule() {
        let provider = Version::new(1, 2, 0);
        assert!(provider.is_compatible(&Version::new(1, 0, 9)));
        assert!(provider.is_compatible(&Version::new(1, 2, 5)));
        assert!(!provider.is_compatible(&Version::new(1, 3, 0)));
        assert!(!provider.is_compatible(&Version::new(2, 0, 0)));
        assert!(!Version::invalid().is_compatible(&Version::invalid()));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Version::parse("1.0.0"), Some(Version::new(1, 0, 0)));
        assert_eq!(Version::parse("10.20.30"), Some(Version::new(10, 20, 30)));
        assert_eq!(Version::parse("1.0"), None);
        assert_eq!(Version::parse("1.0.0.0"), None);
        assert_eq!(Version::parse("1.x.0"), None);
        assert!("1.-1.0".parse::<Version>().is_err());
        assert_eq!(Version::new(3, 1, 4).to_string(), "3.1.4");
    }
}
