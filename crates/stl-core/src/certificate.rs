// ============================================
// File: crates/stl-core/src/certificate.rs
// ============================================
//! # Certificates
//!
//! ## Creation Reason
//! A certificate names a participant and carries its two public keys:
//! the handshake key (signs handshake messages) and the encryption key
//! (receives signcrypted segments). Local certificates also hold the
//! matching private keys.
//!
//! ## Main Functionality
//! - `Certificate::generate`: Fresh key pairs, identity left blank
//! - `validate`: Non-empty identity, private halves match public halves
//! - `marshal` / `unmarshal`: Canonical wire encoding of the public part
//! - Equality over identity and public keys only
//!
//! ## ⚠️ Important Note for Next Developer
//! - Issuance, revocation and chain validation live elsewhere; this is
//!   only the key container
//! - `marshal` never includes private keys
//!
//! ## Last Modified
//! v0.1.0 - Initial certificate implementation

use bytes::Bytes;
use rand::{CryptoRng, RngCore};
use stl_common::types::PeerId;

use crate::crypto::keys::{Curve, EcPrivateKey, EcPublicKey, KeyPair};
use crate::error::{CoreError, Result};
use crate::protocol::{CertificateRecord, Codec, ProtocolCodec, CURRENT_PROTOCOL_VERSION};

// ============================================
// Certificate
// ============================================

/// Identity plus handshake and encryption keys of one participant.
///
/// # Equality
/// Two certificates are equal iff their identities and both public keys
/// (curve and coordinates) match. Private keys are ignored.
///
/// # Example
/// ```
/// use rand::rngs::OsRng;
/// use stl_core::{Certificate, Curve};
///
/// let cert = Certificate::generate(Curve::P256, &mut OsRng)
///     .unwrap()
///     .with_id("server-01");
/// cert.validate().unwrap();
///
/// let decoded = Certificate::unmarshal(Curve::P256, &cert.marshal()).unwrap();
/// assert_eq!(cert, decoded);
/// assert!(!decoded.has_private_keys());
/// ```
#[derive(Debug, Clone)]
pub struct Certificate {
    id: PeerId,
    handshake_key: EcPublicKey,
    encryption_key: EcPublicKey,
    handshake_private: Option<EcPrivateKey>,
    encryption_private: Option<EcPrivateKey>,
}

impl Certificate {
    /// Creates a public-only certificate.
    #[must_use]
    pub fn new(id: impl Into<PeerId>, handshake_key: EcPublicKey, encryption_key: EcPublicKey) -> Self {
        Self {
            id: id.into(),
            handshake_key,
            encryption_key,
            handshake_private: None,
            encryption_private: None,
        }
    }

    /// Creates a certificate holding both key pairs.
    #[must_use]
    pub fn from_key_pairs(id: impl Into<PeerId>, handshake: KeyPair, encryption: KeyPair) -> Self {
        Self {
            id: id.into(),
            handshake_key: *handshake.public(),
            encryption_key: *encryption.public(),
            handshake_private: Some(handshake.private().clone()),
            encryption_private: Some(encryption.private().clone()),
        }
    }

    /// Generates fresh handshake and encryption key pairs.
    ///
    /// The identity is left blank; assign one with [`Certificate::with_id`]
    /// before validation.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if the randomness source fails.
    pub fn generate<R>(curve: Curve, rng: &mut R) -> Result<Self>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let handshake = KeyPair::generate(curve, rng)?;
        let encryption = KeyPair::generate(curve, rng)?;
        Ok(Self::from_key_pairs(PeerId::default(), handshake, encryption))
    }

    /// Returns the certificate with its identity replaced.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<PeerId>) -> Self {
        self.id = id.into();
        self
    }

    /// Checks the certificate invariants.
    ///
    /// # Errors
    /// Returns `Validation` if the identity is empty, the keys are on
    /// different curves, or a private key does not match its public key.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(CoreError::validation("id", "missing ID field"));
        }
        if self.handshake_key.curve() != self.encryption_key.curve() {
            return Err(CoreError::validation(
                "encryption_key",
                format!(
                    "curve {} differs from handshake key curve {}",
                    self.encryption_key.curve(),
                    self.handshake_key.curve()
                ),
            ));
        }
        if let Some(private) = &self.handshake_private {
            if private.public_key() != self.handshake_key {
                return Err(CoreError::validation(
                    "handshake_private",
                    "does not match handshake public key",
                ));
            }
        }
        if let Some(private) = &self.encryption_private {
            if private.public_key() != self.encryption_key {
                return Err(CoreError::validation(
                    "encryption_private",
                    "does not match encryption public key",
                ));
            }
        }
        Ok(())
    }

    /// Encodes the public part of the certificate.
    #[must_use]
    pub fn marshal(&self) -> Vec<u8> {
        let record = CertificateRecord {
            version: CURRENT_PROTOCOL_VERSION,
            id: self.id.clone(),
            handshake_key: self.handshake_key.to_uncompressed(),
            encryption_key: self.encryption_key.to_uncompressed(),
        };
        crate::protocol::encode_message(&record).to_vec()
    }

    /// Decodes a certificate produced by [`Certificate::marshal`].
    ///
    /// # Errors
    /// Returns a protocol error on truncation, wrong type tag, unsupported
    /// version, trailing bytes, or points not on `curve`.
    pub fn unmarshal(curve: Curve, bytes: &[u8]) -> Result<Self> {
        let mut buf = Bytes::copy_from_slice(bytes);
        let record: CertificateRecord = ProtocolCodec.decode(&mut buf)?;

        Ok(Self::new(
            record.id,
            EcPublicKey::from_uncompressed(curve, &record.handshake_key)?,
            EcPublicKey::from_uncompressed(curve, &record.encryption_key)?,
        ))
    }

    /// Returns a copy without private keys.
    #[must_use]
    pub fn public_only(&self) -> Self {
        Self::new(self.id.clone(), self.handshake_key, self.encryption_key)
    }

    /// Returns the identity.
    #[must_use]
    pub const fn id(&self) -> &PeerId {
        &self.id
    }

    /// Returns the curve of the certificate keys.
    #[must_use]
    pub const fn curve(&self) -> Curve {
        self.handshake_key.curve()
    }

    /// Returns the handshake public key.
    #[must_use]
    pub const fn handshake_key(&self) -> &EcPublicKey {
        &self.handshake_key
    }

    /// Returns the encryption public key.
    #[must_use]
    pub const fn encryption_key(&self) -> &EcPublicKey {
        &self.encryption_key
    }

    /// Returns the handshake private key, if held.
    #[must_use]
    pub const fn handshake_private(&self) -> Option<&EcPrivateKey> {
        self.handshake_private.as_ref()
    }

    /// Returns the encryption private key, if held.
    #[must_use]
    pub const fn encryption_private(&self) -> Option<&EcPrivateKey> {
        self.encryption_private.as_ref()
    }

    /// Returns the handshake key pair, if the private half is held.
    #[must_use]
    pub fn handshake_key_pair(&self) -> Option<KeyPair> {
        self.handshake_private.clone().map(KeyPair::from_private)
    }

    /// Returns the encryption key pair, if the private half is held.
    #[must_use]
    pub fn encryption_key_pair(&self) -> Option<KeyPair> {
        self.encryption_private.clone().map(KeyPair::from_private)
    }

    /// Returns `true` if both private keys are held.
    #[must_use]
    pub const fn has_private_keys(&self) -> bool {
        self.handshake_private.is_some() && self.encryption_private.is_some()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.handshake_key == other.handshake_key
            && self.encryption_key == other.encryption_key
    }
}

impl Eq for Certificate {}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            Err(rand::Error::new("no entropy"))
        }
    }

    impl CryptoRng for BrokenRng {}

    fn generated(id: &str) -> Certificate {
        Certificate::generate(Curve::P256, &mut OsRng).unwrap().with_id(id)
    }

    #[test]
    fn test_generate_leaves_id_blank() {
        let cert = Certificate::generate(Curve::P256, &mut OsRng).unwrap();
        assert!(cert.id().is_empty());
        assert!(cert.has_private_keys());
        assert_ne!(cert.handshake_key(), cert.encryption_key());
    }

    #[test]
    fn test_generate_with_broken_rng_fails() {
        let result = Certificate::generate(Curve::P256, &mut BrokenRng);
        assert!(matches!(result, Err(CoreError::KeyGeneration { .. })));
    }

    #[test]
    fn test_validate_requires_id() {
        let cert = Certificate::generate(Curve::P256, &mut OsRng).unwrap();
        assert!(matches!(cert.validate(), Err(CoreError::Validation { .. })));
        assert!(cert.with_id("node").validate().is_ok());
    }

    #[test]
    fn test_validate_detects_mismatched_private_key() {
        let a = generated("a");
        let b = generated("b");
        let mixed = Certificate {
            handshake_private: b.handshake_private.clone(),
            ..a
        };
        assert!(matches!(mixed.validate(), Err(CoreError::Validation { .. })));
    }

    #[test]
    fn test_marshal_roundtrip_is_equal() {
        let cert = generated("server");
        let decoded = Certificate::unmarshal(Curve::P256, &cert.marshal()).unwrap();

        assert_eq!(cert, decoded);
        assert!(decoded.handshake_private().is_none());
        assert!(decoded.encryption_private().is_none());
    }

    #[test]
    fn test_equality_ignores_private_keys() {
        let cert = generated("client");
        assert_eq!(cert, cert.public_only());
    }

    #[test]
    fn test_equality_compares_id_and_keys() {
        let cert = generated("client");
        assert_ne!(cert, cert.clone().with_id("other"));

        let other = generated("client");
        assert_ne!(cert, other);

        let swapped = Certificate::new("client", *cert.encryption_key(), *cert.handshake_key());
        assert_ne!(cert, swapped);
    }

    #[test]
    fn test_unmarshal_rejects_malformed() {
        let encoded = generated("tunnel").marshal();

        assert!(Certificate::unmarshal(Curve::P256, &[]).is_err());
        assert!(Certificate::unmarshal(Curve::P256, &encoded[..encoded.len() - 1]).is_err());

        let mut wrong_type = encoded.clone();
        wrong_type[0] = 0x01;
        assert!(Certificate::unmarshal(Curve::P256, &wrong_type).is_err());

        let mut trailing = encoded.clone();
        trailing.push(0);
        assert!(Certificate::unmarshal(Curve::P256, &trailing).is_err());

        // Last byte is the Y coordinate of the encryption key
        let mut off_curve = encoded;
        let last = off_curve.len() - 1;
        off_curve[last] ^= 0x01;
        let result = Certificate::unmarshal(Curve::P256, &off_curve);
        assert!(matches!(result, Err(CoreError::InvalidPublicKey { .. })));
    }

    #[test]
    fn test_key_pair_accessors() {
        let cert = generated("node");
        let hs = cert.handshake_key_pair().unwrap();
        assert_eq!(hs.public(), cert.handshake_key());
        assert!(cert.public_only().encryption_key_pair().is_none());
    }
}
