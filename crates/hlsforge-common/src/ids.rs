//! Namespace identifiers.
//!
//! A [`Namespace`] names the directory that holds every artifact of one
//! upload. Identifiers are drawn from the operating system's CSPRNG and are
//! never reused.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of random bytes in a namespace identifier (96 bits).
pub const NAMESPACE_BYTES: usize = 12;

/// Length of the rendered identifier in characters.
pub const NAMESPACE_LEN: usize = NAMESPACE_BYTES * 2;

/// Unique identifier for one upload's output directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Generate a new random namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the OS entropy source fails. Callers
    /// treat this as fatal for the request.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; NAMESPACE_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::internal(format!("entropy source failed: {e}")))?;
        Ok(Self(hex::encode(bytes)))
    }

    /// Parse an existing identifier, accepting only the exact rendered form
    /// (24 lowercase hex characters).
    pub fn parse(s: &str) -> Option<Self> {
        let well_formed = s.len() == NAMESPACE_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(s.to_string()))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_shape() {
        let ns = Namespace::generate().unwrap();
        assert_eq!(ns.as_str().len(), NAMESPACE_LEN);
        assert!(ns
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn test_no_collisions() {
        let mut seen = HashSet::with_capacity(100_000);
        for _ in 0..100_000 {
            let ns = Namespace::generate().unwrap();
            assert!(seen.insert(ns), "namespace collision");
        }
    }

    #[test]
    fn test_parse_roundtrip() {
        let ns = Namespace::generate().unwrap();
        assert_eq!(Namespace::parse(ns.as_str()), Some(ns));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Namespace::parse("").is_none());
        assert!(Namespace::parse("abc").is_none());
        assert!(Namespace::parse("ABCDEF0123456789abcdef01").is_none());
        assert!(Namespace::parse("zzzzzz0123456789abcdef01").is_none());
        assert!(Namespace::parse("0123456789abcdef0123456789").is_none());
        assert!(Namespace::parse("../3456789abcdef012345678").is_none());
    }

    #[test]
    fn test_serde_transparent() {
        let ns = Namespace::parse("0123456789abcdef01234567").unwrap();
        let json = serde_json::to_string(&ns).unwrap();
        assert_eq!(json, "\"0123456789abcdef01234567\"");
    }
}
