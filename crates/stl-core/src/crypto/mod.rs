// ============================================
// File: crates/stl-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Centralizes all cryptographic operations of the secure transport layer,
//! using audited RustCrypto implementations.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`keys`]: Curve selection, P-256 key pairs, session keys
//! - [`kdf`]: Session key derivation (HKDF-SHA256)
//! - [`signcrypt`]: Signcryption engine used on the data path
//! - [`handshake`]: Client/server handshakers and the session verifier hook
//!
//! ## Cryptographic Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Handshake Phase                          │
//! │  Client                                        Server       │
//! │    │                                              │         │
//! │    │  id, handshake key, encryption key ────────► │         │
//! │    │  ephemeral key, tunnel binding ────────────► │         │
//! │    │  ECDSA signature ──────────────────────────► │         │
//! │    │                                              │         │
//! │    │                    SessionVerifier decision  │         │
//! │    │                                              │         │
//! │    │ ◄────────────────────────── ephemeral key    │         │
//! │    │ ◄────────────────────────── ECDSA signature  │         │
//! │    │                                              │         │
//! │    │   ECDH(eph, hs) || ECDH(eph, eph)            │         │
//! │    │              │                               │         │
//! │    │              ▼                               │         │
//! │    │      HKDF-SHA256 ─────► Session Key          │         │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Transport Phase                          │
//! │                                                             │
//! │   Session Key + Counter (AAD) ──► Signcrypt ──► Segment     │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL implementations use RustCrypto (audited)
//! - NEVER roll your own crypto primitives
//! - ALL secret keys zeroize on drop
//!
//! ## Last Modified
//! v0.1.0 - Initial crypto implementation

pub mod handshake;
pub mod kdf;
pub mod keys;
pub mod signcrypt;

// Re-export primary types at module level
pub use handshake::{ClientHandshaker, ServerHandshaker, SessionVerifier};
pub use keys::{Curve, EcPrivateKey, EcPublicKey, KeyPair, SessionKey};
pub use signcrypt::{DefaultSigncrypter, Signcrypter, SigncryptionOutput};

// ============================================
// Constants
// ============================================

/// Size of an uncompressed SEC1 P-256 point in bytes.
pub const P256_POINT_SIZE: usize = 65;

/// Size of a P-256 scalar (private key) in bytes.
pub const P256_SCALAR_SIZE: usize = 32;

/// Size of a fixed-width ECDSA P-256 signature in bytes.
pub const ECDSA_SIGNATURE_SIZE: usize = 64;

/// Size of the derived session key in bytes.
pub const SESSION_KEY_SIZE: usize = 32;

/// Size of ChaCha20-Poly1305 key in bytes.
pub const CHACHA20_KEY_SIZE: usize = 32;

/// Size of ChaCha20-Poly1305 nonce in bytes.
pub const CHACHA20_NONCE_SIZE: usize = 12;

/// Size of Poly1305 authentication tag in bytes.
pub const POLY1305_TAG_SIZE: usize = 16;

/// HKDF salt for session key derivation.
pub const HKDF_SALT: &[u8] = b"stl-v1";

/// HKDF info prefix for session key derivation.
pub const HKDF_INFO_PREFIX: &[u8] = b"stl-session-key";

/// HKDF salt for per-segment signcryption keys.
pub const SIGNCRYPT_SALT: &[u8] = b"stl-v1-signcrypt";
