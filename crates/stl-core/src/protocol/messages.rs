// ============================================
// File: crates/stl-core/src/protocol/messages.rs
// ============================================
//! # Protocol Message Definitions
//!
//! ## Creation Reason
//! Defines the structure of all messages exchanged between STL peers,
//! plus the portable certificate record.
//!
//! ## Main Functionality
//! - `MessageType`: Enum for message type identification
//! - `HandshakeRequest`: Client's signed session request
//! - `HandshakeResponse`: Server's signed reply
//! - `Segment`: One signcrypted chunk of application data
//! - `CertificateRecord`: Public part of a certificate
//!
//! ## Wire Format (Little Endian)
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ message_type (1 byte)                      │
//! ├────────────────────────────────────────────┤
//! │ version (1 byte)                           │
//! ├────────────────────────────────────────────┤
//! │ field length (4 bytes LE) │ field bytes    │
//! │ ... repeated per field, in struct order    │
//! └────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Field order is critical - DO NOT reorder without version bump
//! - Key fields hold raw SEC1 bytes; point validation happens in the
//!   handshake and certificate layers, not in the codec
//! - Add new message types at end of enum to maintain compatibility
//!
//! ## Last Modified
//! v0.1.0 - Initial message definitions

use serde::{Deserialize, Serialize};
use stl_common::types::PeerId;

use crate::crypto::signcrypt::SigncryptionOutput;
use crate::protocol::version::CURRENT_PROTOCOL_VERSION;

// ============================================
// Message Type Constants
// ============================================

/// Size of the common message header (type + version).
pub const MESSAGE_HEADER_SIZE: usize = 2;

/// Size of the length prefix of each variable field.
pub const FIELD_LENGTH_SIZE: usize = 4;

// ============================================
// MessageType
// ============================================

/// Protocol message type identifier.
///
/// # Values
/// | Value | Type |
/// |-------|------|
/// | 0x01 | HandshakeRequest |
/// | 0x02 | HandshakeResponse |
/// | 0x03 | Segment |
/// | 0x04 | Certificate |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Client's handshake request.
    HandshakeRequest = 0x01,
    /// Server's handshake response.
    HandshakeResponse = 0x02,
    /// Signcrypted data segment.
    Segment = 0x03,
    /// Certificate record.
    Certificate = 0x04,
}

impl MessageType {
    /// Converts a byte to a `MessageType`.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::HandshakeRequest),
            0x02 => Some(Self::HandshakeResponse),
            0x03 => Some(Self::Segment),
            0x04 => Some(Self::Certificate),
            _ => None,
        }
    }

    /// Converts the `MessageType` to its byte representation.
    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Checks if this is a handshake message.
    #[must_use]
    pub const fn is_handshake(&self) -> bool {
        matches!(self, Self::HandshakeRequest | Self::HandshakeResponse)
    }
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_byte(value).ok_or(value)
    }
}

impl From<MessageType> for u8 {
    fn from(msg_type: MessageType) -> Self {
        msg_type.as_byte()
    }
}

// ============================================
// HandshakeRequest
// ============================================

/// Client's handshake request.
///
/// # Signature Covers
/// The encoding of every field except `signature` (header included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Protocol version.
    pub version: u8,
    /// Client identity.
    pub client_id: PeerId,
    /// Client handshake public key (signs this request).
    pub client_handshake_key: Vec<u8>,
    /// Client long-term encryption public key.
    pub client_encryption_key: Vec<u8>,
    /// Fresh client ephemeral public key.
    pub client_ephemeral_key: Vec<u8>,
    /// Identity of the server the client expects to reach.
    pub server_id: PeerId,
    /// Tunnel identity bound into the handshake.
    pub tunnel_id: PeerId,
    /// Tunnel public key bound into the handshake.
    pub tunnel_key: Vec<u8>,
    /// ECDSA signature by the client handshake key.
    pub signature: Vec<u8>,
}

impl HandshakeRequest {
    /// Creates an unsigned request at the current protocol version.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_id: PeerId,
        client_handshake_key: Vec<u8>,
        client_encryption_key: Vec<u8>,
        client_ephemeral_key: Vec<u8>,
        server_id: PeerId,
        tunnel_id: PeerId,
        tunnel_key: Vec<u8>,
    ) -> Self {
        Self {
            version: CURRENT_PROTOCOL_VERSION,
            client_id,
            client_handshake_key,
            client_encryption_key,
            client_ephemeral_key,
            server_id,
            tunnel_id,
            tunnel_key,
            signature: Vec::new(),
        }
    }
}

// ============================================
// HandshakeResponse
// ============================================

/// Server's handshake response.
///
/// # Signature Covers
/// `SHA-256(request transcript) || server_id || server_ephemeral_key`,
/// binding the reply to exactly one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// Protocol version.
    pub version: u8,
    /// Server identity.
    pub server_id: PeerId,
    /// Fresh server ephemeral public key.
    pub server_ephemeral_key: Vec<u8>,
    /// ECDSA signature by the server signing key.
    pub signature: Vec<u8>,
}

impl HandshakeResponse {
    /// Creates an unsigned response at the current protocol version.
    #[must_use]
    pub fn new(server_id: PeerId, server_ephemeral_key: Vec<u8>) -> Self {
        Self {
            version: CURRENT_PROTOCOL_VERSION,
            server_id,
            server_ephemeral_key,
            signature: Vec::new(),
        }
    }
}

// ============================================
// Segment
// ============================================

/// One signcrypted chunk of application data.
///
/// # Security
/// The segment counter is NOT on the wire; both sides track it and fold
/// it into the associated data, so drops and reorders fail verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Protocol version.
    pub version: u8,
    /// Signcryption output carried by this segment.
    pub payload: SigncryptionOutput,
}

impl Segment {
    /// Wraps a signcryption output at the current protocol version.
    #[must_use]
    pub const fn new(payload: SigncryptionOutput) -> Self {
        Self {
            version: CURRENT_PROTOCOL_VERSION,
            payload,
        }
    }

    /// Returns the total wire size of this segment.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        MESSAGE_HEADER_SIZE
            + 3 * FIELD_LENGTH_SIZE
            + self.payload.ephemeral_key.len()
            + self.payload.ciphertext.len()
            + self.payload.signature.len()
    }
}

// ============================================
// CertificateRecord
// ============================================

/// Public part of a certificate as encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    /// Protocol version.
    pub version: u8,
    /// Certificate identity.
    pub id: PeerId,
    /// Uncompressed handshake public key.
    pub handshake_key: Vec<u8>,
    /// Uncompressed encryption public key.
    pub encryption_key: Vec<u8>,
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_roundtrip() {
        for msg_type in [
            MessageType::HandshakeRequest,
            MessageType::HandshakeResponse,
            MessageType::Segment,
            MessageType::Certificate,
        ] {
            assert_eq!(MessageType::try_from(msg_type.as_byte()), Ok(msg_type));
        }
    }

    #[test]
    fn test_message_type_unknown() {
        assert!(MessageType::from_byte(0x00).is_none());
        assert!(MessageType::from_byte(0xFF).is_none());
    }

    #[test]
    fn test_message_type_classification() {
        assert!(MessageType::HandshakeRequest.is_handshake());
        assert!(MessageType::HandshakeResponse.is_handshake());
        assert!(!MessageType::Segment.is_handshake());
    }

    #[test]
    fn test_segment_wire_size() {
        let segment = Segment::new(SigncryptionOutput {
            ephemeral_key: vec![0u8; 65],
            ciphertext: vec![0u8; 116],
            signature: vec![0u8; 64],
        });
        assert_eq!(segment.wire_size(), 2 + 12 + 65 + 116 + 64);
    }
}
