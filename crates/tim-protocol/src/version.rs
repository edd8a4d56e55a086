//! Protocol version compatibility.
//!
//! Versions are `major.minor.patch`. Peers are compatible when the majors
//! match; while the major is 0 the minors must match as well.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Version spoken by this build.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version string: {0:?}")]
pub struct VersionError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn is_compatible_with(&self, other: &Version) -> bool {
        if self.major != other.major {
            return false;
        }
        self.major != 0 || self.minor == other.minor
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Pre-release and build suffixes do not affect compatibility.
        let core = s.trim().split(['-', '+']).next().unwrap_or_default();
        let mut parts = core.split('.');
        let mut next = || -> Result<u64, VersionError> {
            match parts.next() {
                None => Ok(0),
                Some(p) => p.parse().map_err(|_| VersionError(s.to_string())),
            }
        };
        let version = Version {
            major: next()?,
            minor: next()?,
            patch: next()?,
        };
        if core.is_empty() || parts.next().is_some() {
            return Err(VersionError(s.to_string()));
        }
        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Whether a server reporting `server` can serve a client built as `client`.
/// Unparseable versions are never compatible.
pub fn is_compatible(server: &str, client: &str) -> bool {
    match (server.parse::<Version>(), client.parse::<Version>()) {
        (Ok(server), Ok(client)) => server.is_compatible_with(&client),
        _ => false,
    }
}
