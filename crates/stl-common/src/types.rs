// ============================================
// File: crates/stl-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Identities (client, server, tunnel) travel through certificates,
//! handshake messages, verifier callbacks and config files. `PeerId` gives
//! them one representation instead of loose `Vec<u8>` fields.
//!
//! ## Main Functionality
//! - `PeerId`: Opaque identity bytes assigned by an external authority
//! - Base64 display/parsing and serde support for config files
//!
//! ## ⚠️ Important Note for Next Developer
//! - A `PeerId` may be empty until validated; emptiness is checked by
//!   certificate and config validation, not by construction
//! - Maintain backward-compatible serialization formats
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::error::CommonError;

// ============================================
// PeerId
// ============================================

/// Identity of a protocol participant.
///
/// # Example
/// ```
/// use stl_common::types::PeerId;
///
/// let id = PeerId::from("server-01");
/// let parsed: PeerId = id.to_string().parse().unwrap();
///
/// assert_eq!(id, parsed);
/// assert_eq!(id.as_bytes(), b"server-01");
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(Vec<u8>);

impl PeerId {
    /// Creates an identity from raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw identity bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns `true` if no identity has been assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the identity length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<&[u8]> for PeerId {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Vec<u8>> for PeerId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl AsRef<[u8]> for PeerId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_graphic()) => {
                write!(f, "PeerId({s:?})")
            }
            _ => write!(f, "PeerId({})", BASE64.encode(&self.0)),
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", BASE64.encode(&self.0))
    }
}

impl FromStr for PeerId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(BASE64.decode(s)?))
    }
}

impl Serialize for PeerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&BASE64.encode(&self.0))
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for PeerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            <Vec<u8>>::deserialize(deserializer).map(Self)
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id_display_roundtrip() {
        let id = PeerId::new(vec![0x00, 0xFF, 0x10, 0x20]);
        let parsed: PeerId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_peer_id_invalid_base64() {
        let result = "not base64!!".parse::<PeerId>();
        assert!(matches!(result, Err(CommonError::Decoding { .. })));
    }

    #[test]
    fn test_peer_id_debug_shows_printable_ids() {
        assert_eq!(format!("{:?}", PeerId::from("tunnel-7")), "PeerId(\"tunnel-7\")");
        assert_eq!(format!("{:?}", PeerId::new(vec![0u8; 3])), "PeerId(AAAA)");
    }

    #[test]
    fn test_peer_id_empty() {
        assert!(PeerId::default().is_empty());
        assert_eq!(PeerId::from("ab").len(), 2);
    }

    #[test]
    fn test_peer_id_json_serialization() {
        let id = PeerId::from("client-a");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));

        let restored: PeerId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }
}
