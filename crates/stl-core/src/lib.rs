// ============================================
// File: crates/stl-core/src/lib.rs
// ============================================
//! # STL Core - Protocol & Cryptography Library
//!
//! ## Creation Reason
//! Provides certificates, key material, the handshake protocol and the wire
//! codec for the STL secure transport. The transport crate drives these
//! pieces over a byte stream.
//!
//! ## Main Functionality
//!
//! ### Certificates ([`certificate`])
//! - Identity plus handshake and encryption keys
//! - Canonical marshal/unmarshal, generation, validation
//!
//! ### Crypto Module ([`crypto`])
//! - Key types (`Curve`, `EcPrivateKey`, `EcPublicKey`, `KeyPair`, `SessionKey`)
//! - Handshakers and the `SessionVerifier` authorization hook
//! - Signcryption engine (`Signcrypter`, `DefaultSigncrypter`)
//! - Key derivation (HKDF-SHA256)
//!
//! ### Protocol Module ([`protocol`])
//! - Handshake, segment and certificate messages
//! - Binary codec for wire format serialization
//! - Protocol version management
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   stl-node                          │
//! │                      │                              │
//! │                      ▼                              │
//! │                stl-transport                        │
//! │                      │                              │
//! │                      ▼                              │
//! │                  stl-core  ◄── You are here         │
//! │                      │                              │
//! │                      ▼                              │
//! │                 stl-common                          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Guarantees
//! - **Authenticity**: ECDSA P-256 signatures on both handshake messages
//!   and on every segment
//! - **Forward Secrecy**: Ephemeral ECDH per handshake and per segment
//! - **Confidentiality**: ChaCha20-Poly1305 inside signcryption
//! - **Ordering**: Segment counters folded into associated data
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL cryptographic code uses audited RustCrypto implementations
//! - ALL secret keys zeroize on drop
//! - Protocol changes MUST bump the protocol version
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod certificate;
pub mod crypto;
pub mod error;
pub mod protocol;

// Re-export commonly used items
pub use certificate::Certificate;
pub use crypto::{
    ClientHandshaker, Curve, DefaultSigncrypter, EcPrivateKey, EcPublicKey, KeyPair,
    ServerHandshaker, SessionKey, SessionVerifier, Signcrypter, SigncryptionOutput,
};
pub use error::{CoreError, Result};
pub use protocol::{
    HandshakeRequest, HandshakeResponse, MessageType, ProtocolVersion, Segment,
    CURRENT_PROTOCOL_VERSION,
};
