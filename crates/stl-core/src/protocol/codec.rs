// ============================================
// File: crates/stl-core/src/protocol/codec.rs
// ============================================
//! # Protocol Codec
//!
//! ## Creation Reason
//! Provides binary serialization and deserialization for protocol
//! messages and certificate records.
//!
//! ## Main Functionality
//! - `Codec` trait: Generic encode/decode interface
//! - `ProtocolCodec`: Implementation for all message types
//! - `request_transcript`: The signed portion of a handshake request
//!
//! ## Parsing Strategy
//! 1. Check header length
//! 2. Check message type and version
//! 3. Read each length-prefixed field, bounds-checked before copying
//! 4. Reject trailing bytes
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always validate buffer lengths before reading
//! - A length prefix is never trusted for allocation beyond what the
//!   buffer actually holds
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use bytes::{Buf, BufMut, Bytes, BytesMut};
use stl_common::types::PeerId;

use crate::crypto::signcrypt::SigncryptionOutput;
use crate::error::{CoreError, Result};
use crate::protocol::messages::{
    CertificateRecord, HandshakeRequest, HandshakeResponse, MessageType, Segment,
    FIELD_LENGTH_SIZE, MESSAGE_HEADER_SIZE,
};
use crate::protocol::version::{ProtocolVersion, CURRENT_PROTOCOL_VERSION};

// ============================================
// Codec Trait
// ============================================

/// Trait for encoding and decoding protocol messages.
///
/// # Type Parameters
/// * `T` - The message type to encode/decode
pub trait Codec<T> {
    /// Encodes a message into a byte buffer.
    fn encode(&self, msg: &T, buf: &mut BytesMut);

    /// Decodes a message from bytes.
    ///
    /// The buffer must contain exactly one message.
    ///
    /// # Errors
    /// Returns a protocol error if the bytes are not a valid message.
    fn decode(&self, buf: &mut Bytes) -> Result<T>;
}

// ============================================
// ProtocolCodec
// ============================================

/// Codec implementation for all protocol messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtocolCodec;

impl ProtocolCodec {
    /// Creates a new protocol codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

// ============================================
// Field Helpers
// ============================================

fn put_header(buf: &mut BytesMut, msg_type: MessageType, version: u8) {
    buf.put_u8(msg_type.as_byte());
    buf.put_u8(version);
}

#[allow(clippy::cast_possible_truncation)]
fn put_field(buf: &mut BytesMut, field: &[u8]) {
    // Frames are capped far below 4 GiB, so every field fits
    debug_assert!(u32::try_from(field.len()).is_ok());
    buf.put_u32_le(field.len() as u32);
    buf.put_slice(field);
}

fn get_header(buf: &mut Bytes, expected: MessageType) -> Result<u8> {
    if buf.len() < MESSAGE_HEADER_SIZE {
        return Err(CoreError::too_short(MESSAGE_HEADER_SIZE, buf.len()));
    }

    let msg_type = buf.get_u8();
    if msg_type != expected.as_byte() {
        return match MessageType::from_byte(msg_type) {
            Some(other) => Err(CoreError::malformed(format!(
                "Expected {expected:?} (0x{:02x}), got {other:?} (0x{msg_type:02x})",
                expected.as_byte()
            ))),
            None => Err(CoreError::UnknownMessageType(msg_type)),
        };
    }

    let version = buf.get_u8();
    if !ProtocolVersion::new(version).is_supported() {
        return Err(CoreError::UnsupportedVersion {
            got: version,
            expected: CURRENT_PROTOCOL_VERSION,
        });
    }

    Ok(version)
}

fn get_field(buf: &mut Bytes, name: &str) -> Result<Vec<u8>> {
    if buf.len() < FIELD_LENGTH_SIZE {
        return Err(CoreError::malformed(format!("truncated length of '{name}'")));
    }
    let len = buf.get_u32_le() as usize;
    if buf.len() < len {
        return Err(CoreError::malformed(format!(
            "field '{name}' declares {len} bytes, {} remain",
            buf.len()
        )));
    }
    Ok(buf.split_to(len).to_vec())
}

fn get_id(buf: &mut Bytes, name: &str) -> Result<PeerId> {
    get_field(buf, name).map(PeerId::from)
}

fn finish(buf: &Bytes, msg_type: MessageType) -> Result<()> {
    if buf.has_remaining() {
        return Err(CoreError::malformed(format!(
            "{} trailing bytes after {msg_type:?}",
            buf.remaining()
        )));
    }
    Ok(())
}

// ============================================
// HandshakeRequest Codec
// ============================================

/// Encodes the signed portion of a request (everything but the signature).
#[must_use]
pub fn request_transcript(msg: &HandshakeRequest) -> BytesMut {
    let mut buf = BytesMut::with_capacity(
        MESSAGE_HEADER_SIZE
            + 7 * FIELD_LENGTH_SIZE
            + msg.client_id.len()
            + msg.client_handshake_key.len()
            + msg.client_encryption_key.len()
            + msg.client_ephemeral_key.len()
            + msg.server_id.len()
            + msg.tunnel_id.len()
            + msg.tunnel_key.len(),
    );
    put_header(&mut buf, MessageType::HandshakeRequest, msg.version);
    put_field(&mut buf, msg.client_id.as_bytes());
    put_field(&mut buf, &msg.client_handshake_key);
    put_field(&mut buf, &msg.client_encryption_key);
    put_field(&mut buf, &msg.client_ephemeral_key);
    put_field(&mut buf, msg.server_id.as_bytes());
    put_field(&mut buf, msg.tunnel_id.as_bytes());
    put_field(&mut buf, &msg.tunnel_key);
    buf
}

impl Codec<HandshakeRequest> for ProtocolCodec {
    fn encode(&self, msg: &HandshakeRequest, buf: &mut BytesMut) {
        buf.extend_from_slice(&request_transcript(msg));
        put_field(buf, &msg.signature);
    }

    fn decode(&self, buf: &mut Bytes) -> Result<HandshakeRequest> {
        let version = get_header(buf, MessageType::HandshakeRequest)?;
        let msg = HandshakeRequest {
            version,
            client_id: get_id(buf, "client_id")?,
            client_handshake_key: get_field(buf, "client_handshake_key")?,
            client_encryption_key: get_field(buf, "client_encryption_key")?,
            client_ephemeral_key: get_field(buf, "client_ephemeral_key")?,
            server_id: get_id(buf, "server_id")?,
            tunnel_id: get_id(buf, "tunnel_id")?,
            tunnel_key: get_field(buf, "tunnel_key")?,
            signature: get_field(buf, "signature")?,
        };
        finish(buf, MessageType::HandshakeRequest)?;
        Ok(msg)
    }
}

// ============================================
// HandshakeResponse Codec
// ============================================

impl Codec<HandshakeResponse> for ProtocolCodec {
    fn encode(&self, msg: &HandshakeResponse, buf: &mut BytesMut) {
        buf.reserve(
            MESSAGE_HEADER_SIZE
                + 3 * FIELD_LENGTH_SIZE
                + msg.server_id.len()
                + msg.server_ephemeral_key.len()
                + msg.signature.len(),
        );
        put_header(buf, MessageType::HandshakeResponse, msg.version);
        put_field(buf, msg.server_id.as_bytes());
        put_field(buf, &msg.server_ephemeral_key);
        put_field(buf, &msg.signature);
    }

    fn decode(&self, buf: &mut Bytes) -> Result<HandshakeResponse> {
        let version = get_header(buf, MessageType::HandshakeResponse)?;
        let msg = HandshakeResponse {
            version,
            server_id: get_id(buf, "server_id")?,
            server_ephemeral_key: get_field(buf, "server_ephemeral_key")?,
            signature: get_field(buf, "signature")?,
        };
        finish(buf, MessageType::HandshakeResponse)?;
        Ok(msg)
    }
}

// ============================================
// Segment Codec
// ============================================

impl Codec<Segment> for ProtocolCodec {
    fn encode(&self, msg: &Segment, buf: &mut BytesMut) {
        buf.reserve(msg.wire_size());
        put_header(buf, MessageType::Segment, msg.version);
        put_field(buf, &msg.payload.ephemeral_key);
        put_field(buf, &msg.payload.ciphertext);
        put_field(buf, &msg.payload.signature);
    }

    fn decode(&self, buf: &mut Bytes) -> Result<Segment> {
        let version = get_header(buf, MessageType::Segment)?;
        let payload = SigncryptionOutput {
            ephemeral_key: get_field(buf, "ephemeral_key")?,
            ciphertext: get_field(buf, "ciphertext")?,
            signature: get_field(buf, "signature")?,
        };
        finish(buf, MessageType::Segment)?;
        Ok(Segment { version, payload })
    }
}

// ============================================
// CertificateRecord Codec
// ============================================

impl Codec<CertificateRecord> for ProtocolCodec {
    fn encode(&self, msg: &CertificateRecord, buf: &mut BytesMut) {
        buf.reserve(
            MESSAGE_HEADER_SIZE
                + 3 * FIELD_LENGTH_SIZE
                + msg.id.len()
                + msg.handshake_key.len()
                + msg.encryption_key.len(),
        );
        put_header(buf, MessageType::Certificate, msg.version);
        put_field(buf, msg.id.as_bytes());
        put_field(buf, &msg.handshake_key);
        put_field(buf, &msg.encryption_key);
    }

    fn decode(&self, buf: &mut Bytes) -> Result<CertificateRecord> {
        let version = get_header(buf, MessageType::Certificate)?;
        let msg = CertificateRecord {
            version,
            id: get_id(buf, "id")?,
            handshake_key: get_field(buf, "handshake_key")?,
            encryption_key: get_field(buf, "encryption_key")?,
        };
        finish(buf, MessageType::Certificate)?;
        Ok(msg)
    }
}

// ============================================
// Convenience Functions
// ============================================

/// Encodes any message to bytes.
#[must_use]
pub fn encode_message<T>(msg: &T) -> BytesMut
where
    ProtocolCodec: Codec<T>,
{
    let mut buf = BytesMut::new();
    ProtocolCodec.encode(msg, &mut buf);
    buf
}

/// Decodes a message from bytes.
///
/// # Errors
/// Returns a protocol error if the bytes are not exactly one valid `T`.
pub fn decode_message<T>(buf: &[u8]) -> Result<T>
where
    ProtocolCodec: Codec<T>,
{
    let mut bytes = Bytes::copy_from_slice(buf);
    ProtocolCodec.decode(&mut bytes)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> HandshakeRequest {
        let mut request = HandshakeRequest::new(
            PeerId::from("client"),
            vec![0x04; 65],
            vec![0x05; 65],
            vec![0x06; 65],
            PeerId::from("server"),
            PeerId::from("tunnel"),
            vec![0x07; 65],
        );
        request.signature = vec![0x08; 64];
        request
    }

    #[test]
    fn test_request_roundtrip() {
        let original = sample_request();
        let encoded = encode_message(&original);
        let decoded: HandshakeRequest = decode_message(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_transcript_excludes_signature() {
        let mut request = sample_request();
        let before = request_transcript(&request);
        request.signature = vec![0xFF; 64];
        assert_eq!(before, request_transcript(&request));

        let encoded = encode_message(&request);
        assert_eq!(encoded.len(), before.len() + FIELD_LENGTH_SIZE + 64);
    }

    #[test]
    fn test_response_layout() {
        let mut response = HandshakeResponse::new(PeerId::from("srv"), vec![0x04; 65]);
        response.signature = vec![0x09; 64];

        let encoded = encode_message(&response);
        assert_eq!(encoded[0], MessageType::HandshakeResponse.as_byte());
        assert_eq!(encoded[1], CURRENT_PROTOCOL_VERSION);
        assert_eq!(&encoded[2..6], &3u32.to_le_bytes());
        assert_eq!(&encoded[6..9], b"srv");

        let decoded: HandshakeResponse = decode_message(&encoded).unwrap();
        assert_eq!(response, decoded);
    }

    #[test]
    fn test_decode_wrong_message_type() {
        let encoded = encode_message(&sample_request());
        let result: Result<HandshakeResponse> = decode_message(&encoded);
        assert!(matches!(result, Err(CoreError::MalformedMessage { .. })));
    }

    #[test]
    fn test_decode_unsupported_version() {
        let mut encoded = encode_message(&sample_request());
        encoded[1] = 0x7F;
        let result: Result<HandshakeRequest> = decode_message(&encoded);
        assert!(matches!(
            result,
            Err(CoreError::UnsupportedVersion { got: 0x7F, .. })
        ));
    }

    #[test]
    fn test_decode_truncated() {
        let encoded = encode_message(&sample_request());
        for cut in [0, 1, 2, 5, encoded.len() - 1] {
            let result: Result<HandshakeRequest> = decode_message(&encoded[..cut]);
            assert!(result.is_err(), "truncation at {cut} accepted");
            assert!(matches!(
                result,
                Err(CoreError::MessageTooShort { .. } | CoreError::MalformedMessage { .. })
            ));
        }
    }

    #[test]
    fn test_decode_oversized_length_prefix() {
        let mut buf = BytesMut::new();
        put_header(&mut buf, MessageType::Segment, CURRENT_PROTOCOL_VERSION);
        buf.put_u32_le(u32::MAX);
        buf.put_slice(&[0u8; 8]);

        let result: Result<Segment> = decode_message(&buf);
        assert!(matches!(result, Err(CoreError::MalformedMessage { .. })));
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut encoded = encode_message(&sample_request());
        encoded.put_u8(0x00);
        let result: Result<HandshakeRequest> = decode_message(&encoded);
        assert!(matches!(result, Err(CoreError::MalformedMessage { .. })));
    }

    #[test]
    fn test_segment_roundtrip() {
        let segment = Segment::new(SigncryptionOutput {
            ephemeral_key: vec![0x04; 65],
            ciphertext: vec![0xAB; 40],
            signature: vec![0xCD; 64],
        });
        let encoded = encode_message(&segment);
        assert_eq!(encoded.len(), segment.wire_size());

        let decoded: Segment = decode_message(&encoded).unwrap();
        assert_eq!(segment, decoded);
    }
}
