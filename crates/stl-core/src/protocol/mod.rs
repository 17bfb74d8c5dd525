// ============================================
// File: crates/stl-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the wire protocol for STL communication, including message
//! types, formats, and serialization.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`messages`]: Protocol message structures
//! - [`codec`]: Binary serialization/deserialization
//! - [`version`]: Protocol versioning
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Handshake Phase                          │
//! │                                                             │
//! │  Client ──────── HandshakeRequest ─────────────────► Server │
//! │  Client ◄─────── HandshakeResponse ────────────────  Server │
//! │                                                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    Transport Phase                          │
//! │                                                             │
//! │  Client ══════ Segment (signcrypted) ══════════════  Server │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format Principles
//! - Little-endian byte order for multi-byte integers
//! - Type and version byte at the start of every message
//! - Variable fields carry a 4-byte length prefix
//!
//! ## ⚠️ Important Note for Next Developer
//! - ANY protocol change requires version bump
//! - Framing (the 8-byte length prefix) lives in the transport crate
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod codec;
pub mod messages;
pub mod version;

// Re-export primary types
pub use codec::{decode_message, encode_message, request_transcript, Codec, ProtocolCodec};
pub use messages::{CertificateRecord, HandshakeRequest, HandshakeResponse, MessageType, Segment};
pub use version::{ProtocolVersion, CURRENT_PROTOCOL_VERSION};
