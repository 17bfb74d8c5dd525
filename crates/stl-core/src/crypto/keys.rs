// ============================================
// File: crates/stl-core/src/crypto/keys.rs
// ============================================
//! # Cryptographic Key Types
//!
//! ## Creation Reason
//! Defines key types used throughout the STL protocol with proper
//! security properties (zeroize on drop, constant-time comparison).
//!
//! ## Main Functionality
//! - `Curve`: Explicit curve selection threaded through every constructor
//! - `EcPrivateKey` / `EcPublicKey`: P-256 keys (ECDSA signing, ECDH)
//! - `KeyPair`: Private key with its cached public half
//! - `SessionKey`: Handshake output, scopes per-segment associated data
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  Handshake / encryption key pairs (long-term)              │
//! │  ├─ Generated once per certificate                         │
//! │  └─ Identify the endpoint                                  │
//! │                                                            │
//! │  Ephemeral key pairs (per-handshake, per-segment)          │
//! │  ├─ Generated fresh from the randomness source             │
//! │  └─ Dropped (zeroized) once the shared secret is derived   │
//! │                                                            │
//! │  SessionKey (per-connection)                               │
//! │  ├─ Derived from the handshake key agreement               │
//! │  └─ Folded into every segment's associated data            │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Private keys must NEVER be logged or serialized carelessly
//! - Generation goes through `try_fill_bytes` so a broken randomness
//!   source surfaces as `KeyGeneration` instead of a panic
//!
//! ## Last Modified
//! v0.1.0 - Initial key type definitions

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{ECDSA_SIGNATURE_SIZE, P256_POINT_SIZE, P256_SCALAR_SIZE, SESSION_KEY_SIZE};
use crate::error::{CoreError, Result};

/// Number of scalar candidates drawn before giving up on generation.
///
/// A uniformly random 32-byte string is out of range for P-256 with
/// probability below 2^-32, so hitting this limit means a broken source.
const MAX_SCALAR_ATTEMPTS: usize = 8;

/// Leading byte of an uncompressed SEC1 point.
const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

// ============================================
// Curve
// ============================================

/// Elliptic curve used for every key in a deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Curve {
    /// NIST P-256 (secp256r1).
    #[default]
    #[serde(rename = "P-256")]
    P256,
}

impl Curve {
    /// Returns the curve's standard name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
        }
    }

    /// Size of an uncompressed point on this curve.
    #[must_use]
    pub const fn point_size(self) -> usize {
        match self {
            Self::P256 => P256_POINT_SIZE,
        }
    }

    /// Size of a private scalar on this curve.
    #[must_use]
    pub const fn scalar_size(self) -> usize {
        match self {
            Self::P256 => P256_SCALAR_SIZE,
        }
    }

    /// Size of a fixed-width ECDSA signature on this curve.
    #[must_use]
    pub const fn signature_size(self) -> usize {
        match self {
            Self::P256 => ECDSA_SIGNATURE_SIZE,
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================
// EcPublicKey
// ============================================

/// Public key on a [`Curve`].
///
/// Equality compares the curve and the point coordinates.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EcPublicKey {
    curve: Curve,
    point: p256::PublicKey,
}

impl EcPublicKey {
    /// Parses an uncompressed SEC1 point on `curve`.
    ///
    /// # Errors
    /// Returns `InvalidPublicKey` if the encoding is not an uncompressed
    /// point or the point is not on the curve.
    pub fn from_uncompressed(curve: Curve, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != curve.point_size() {
            return Err(CoreError::invalid_public_key(format!(
                "expected {} bytes for {curve}, got {}",
                curve.point_size(),
                bytes.len()
            )));
        }
        if bytes[0] != SEC1_UNCOMPRESSED_TAG {
            return Err(CoreError::invalid_public_key(format!(
                "expected uncompressed tag 0x04, got 0x{:02x}",
                bytes[0]
            )));
        }

        let point = match curve {
            Curve::P256 => p256::PublicKey::from_sec1_bytes(bytes)
                .map_err(|_| CoreError::invalid_public_key(format!("point not on {curve}")))?,
        };

        Ok(Self { curve, point })
    }

    /// Returns the uncompressed SEC1 encoding.
    #[must_use]
    pub fn to_uncompressed(&self) -> Vec<u8> {
        self.point.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Returns the curve this key lives on.
    #[must_use]
    pub const fn curve(&self) -> Curve {
        self.curve
    }

    /// Verifies an ECDSA signature (SHA-256) over `message`.
    ///
    /// # Errors
    /// Returns `SignatureVerification` if the signature is malformed or
    /// does not match.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        if signature.len() != self.curve.signature_size() {
            return Err(CoreError::SignatureVerification);
        }
        let signature =
            Signature::from_slice(signature).map_err(|_| CoreError::SignatureVerification)?;
        VerifyingKey::from(self.point)
            .verify(message, &signature)
            .map_err(|_| CoreError::SignatureVerification)
    }
}

impl fmt::Debug for EcPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Skip the SEC1 tag, show the start of X
        let encoded = self.to_uncompressed();
        write!(
            f,
            "EcPublicKey({}, {}...)",
            self.curve,
            hex::encode(&encoded[1..5])
        )
    }
}

impl fmt::Display for EcPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", BASE64.encode(self.to_uncompressed()))
    }
}

impl Serialize for EcPublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&BASE64.encode(self.to_uncompressed()))
        } else {
            serializer.serialize_bytes(&self.to_uncompressed())
        }
    }
}

impl<'de> Deserialize<'de> for EcPublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            BASE64.decode(&s).map_err(serde::de::Error::custom)?
        } else {
            <Vec<u8>>::deserialize(deserializer)?
        };
        Self::from_uncompressed(Curve::default(), &bytes).map_err(serde::de::Error::custom)
    }
}

// ============================================
// EcPrivateKey
// ============================================

/// Private key on a [`Curve`], usable for ECDSA signing and ECDH.
///
/// # Security
/// - The scalar is zeroed on drop
/// - `Debug` prints only the public half
#[derive(Clone)]
pub struct EcPrivateKey {
    curve: Curve,
    secret: p256::SecretKey,
}

impl EcPrivateKey {
    /// Generates a private key from the supplied randomness source.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if the randomness source fails.
    pub fn generate<R>(curve: Curve, rng: &mut R) -> Result<Self>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        for _ in 0..MAX_SCALAR_ATTEMPTS {
            let mut candidate = Zeroizing::new([0u8; P256_SCALAR_SIZE]);
            rng.try_fill_bytes(&mut candidate[..]).map_err(|e| {
                CoreError::key_generation(format!("randomness source failed: {e}"))
            })?;

            // Zero or >= group order: draw again
            if let Ok(secret) = p256::SecretKey::from_slice(&candidate[..]) {
                return Ok(Self { curve, secret });
            }
        }

        Err(CoreError::key_generation(format!(
            "no valid {curve} scalar after {MAX_SCALAR_ATTEMPTS} attempts"
        )))
    }

    /// Restores a private key from its big-endian scalar bytes.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if the bytes are not a valid scalar.
    pub fn from_bytes(curve: Curve, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != curve.scalar_size() {
            return Err(CoreError::key_generation(format!(
                "invalid {curve} private key size: expected {}, got {}",
                curve.scalar_size(),
                bytes.len()
            )));
        }
        let secret = p256::SecretKey::from_slice(bytes)
            .map_err(|_| CoreError::key_generation(format!("invalid {curve} scalar")))?;
        Ok(Self { curve, secret })
    }

    /// Exports the scalar bytes for secure storage.
    ///
    /// # Security Warning
    /// The returned buffer zeroizes on drop; do not copy it elsewhere.
    #[must_use]
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.secret.to_bytes().to_vec())
    }

    /// Returns the public half.
    #[must_use]
    pub fn public_key(&self) -> EcPublicKey {
        EcPublicKey {
            curve: self.curve,
            point: self.secret.public_key(),
        }
    }

    /// Returns the curve this key lives on.
    #[must_use]
    pub const fn curve(&self) -> Curve {
        self.curve
    }

    /// Signs `message` with deterministic ECDSA (RFC 6979, SHA-256).
    ///
    /// # Returns
    /// Fixed-width `r || s` signature.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signing_key = SigningKey::from(&self.secret);
        let signature: Signature = signing_key.sign(message);
        signature.to_bytes().to_vec()
    }

    /// Performs ECDH with a peer public key.
    ///
    /// # Returns
    /// The x-coordinate of the shared point.
    ///
    /// # Errors
    /// Returns `KeyExchange` if the peer key is on a different curve.
    pub fn diffie_hellman(&self, peer: &EcPublicKey) -> Result<Zeroizing<[u8; 32]>> {
        if peer.curve != self.curve {
            return Err(CoreError::KeyExchange {
                reason: format!("curve mismatch: {} vs {}", self.curve, peer.curve),
            });
        }

        let shared =
            p256::ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), peer.point.as_affine());
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(shared.raw_secret_bytes().as_slice());
        Ok(out)
    }
}

impl fmt::Debug for EcPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print private key material
        f.debug_struct("EcPrivateKey")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

// ============================================
// KeyPair
// ============================================

/// Private key together with its public key.
#[derive(Clone, Debug)]
pub struct KeyPair {
    private: EcPrivateKey,
    public: EcPublicKey,
}

impl KeyPair {
    /// Generates a fresh key pair from the supplied randomness source.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if the randomness source fails.
    pub fn generate<R>(curve: Curve, rng: &mut R) -> Result<Self>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        EcPrivateKey::generate(curve, rng).map(Self::from_private)
    }

    /// Builds a key pair around an existing private key.
    #[must_use]
    pub fn from_private(private: EcPrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    /// Returns the private key.
    #[must_use]
    pub const fn private(&self) -> &EcPrivateKey {
        &self.private
    }

    /// Returns the public key.
    #[must_use]
    pub const fn public(&self) -> &EcPublicKey {
        &self.public
    }

    /// Returns the curve of this key pair.
    #[must_use]
    pub const fn curve(&self) -> Curve {
        self.private.curve
    }
}

// ============================================
// SessionKey
// ============================================

/// Session key agreed during the handshake.
///
/// # Purpose
/// Prefixes the associated data of every segment so that segments are
/// bound to exactly one handshake.
///
/// # Security
/// - Zeroed on drop
/// - Never logged or serialized
/// - Constant-time comparison
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_SIZE]);

impl SessionKey {
    /// Creates a session key from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SESSION_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    ///
    /// # Security Warning
    /// Do not log or store the key material in unprotected storage.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey([REDACTED])")
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for SessionKey {}

// ============================================
// Tests
// ============================================
