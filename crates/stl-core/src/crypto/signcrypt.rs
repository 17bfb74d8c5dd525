// ============================================
// File: crates/stl-core/src/crypto/signcrypt.rs
// ============================================
//! # Signcryption Engine
//!
//! ## Creation Reason
//! Every application segment is encrypted to the peer and signed by the
//! sender in one operation. The connection only depends on the
//! `Signcrypter` trait so the primitive can be swapped out.
//!
//! ## Main Functionality
//! - `Signcrypter`: Trait for signcrypt/unsigncrypt
//! - `SigncryptionOutput`: Ephemeral key, ciphertext, signature
//! - `DefaultSigncrypter`: P-256 ECDH + HKDF-SHA256 + ChaCha20-Poly1305,
//!   authenticated by an ECDSA signature from the sender
//!
//! ## Construction
//! ```text
//! eph        = fresh key pair (OsRng)
//! shared     = ECDH(eph, recipient_pub)
//! key        = HKDF-SHA256(salt = "stl-v1-signcrypt", shared,
//!                          info = eph_pub || recipient_pub || sender_pub)
//! ciphertext = ChaCha20-Poly1305(key, nonce = 0, plaintext, aad)
//! signature  = ECDSA(sender_priv, eph_pub || len(ct) u64 LE || ct
//!                                 || aad || recipient_pub)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The zero nonce is only safe because every message uses a fresh
//!   ephemeral key, and therefore a fresh cipher key
//! - `unsigncrypt` returns `Ok(None)` for anything not authentic; callers
//!   must treat that as an integrity failure
//!
//! ## Last Modified
//! v0.1.0 - Initial signcryption engine

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::rngs::OsRng;
use tracing::debug;

use super::kdf::hkdf_expand;
use super::keys::{EcPrivateKey, EcPublicKey, KeyPair};
use super::{CHACHA20_KEY_SIZE, CHACHA20_NONCE_SIZE, POLY1305_TAG_SIZE, SIGNCRYPT_SALT};
use crate::error::{CoreError, Result};

/// Overhead added to each plaintext by the default engine, excluding the
/// ephemeral key and signature.
pub const SIGNCRYPT_OVERHEAD: usize = POLY1305_TAG_SIZE;

// ============================================
// SigncryptionOutput
// ============================================

/// Result of a signcryption operation, as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigncryptionOutput {
    /// Uncompressed ephemeral public key
    pub ephemeral_key: Vec<u8>,
    /// Encrypted payload including authentication tag
    pub ciphertext: Vec<u8>,
    /// Sender signature
    pub signature: Vec<u8>,
}

// ============================================
// Signcrypter Trait
// ============================================

/// Public-key signcryption primitive.
///
/// # Contract
/// `unsigncrypt(sender.public, recipient.private, aad,
/// signcrypt(sender.private, recipient.public, m, aad))` returns `m`.
/// Any change to the output, the associated data or either key must yield
/// `Ok(None)`.
pub trait Signcrypter: Send + Sync {
    /// Encrypts `plaintext` to `recipient` and signs it as `sender`.
    ///
    /// # Errors
    /// Returns a crypto error if key generation or encryption fails.
    fn signcrypt(
        &self,
        sender: &EcPrivateKey,
        recipient: &EcPublicKey,
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<SigncryptionOutput>;

    /// Verifies and decrypts `output`.
    ///
    /// # Returns
    /// - `Ok(Some(plaintext))` if authentic
    /// - `Ok(None)` if the signature, ciphertext or associated data do not
    ///   check out
    ///
    /// # Errors
    /// Returns a crypto error for local failures (e.g. mismatched curves).
    fn unsigncrypt(
        &self,
        sender: &EcPublicKey,
        recipient: &EcPrivateKey,
        aad: &[u8],
        output: &SigncryptionOutput,
    ) -> Result<Option<Vec<u8>>>;
}

// ============================================
// DefaultSigncrypter
// ============================================

/// Default P-256 signcryption engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSigncrypter;

impl DefaultSigncrypter {
    /// Creates a new instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn cipher(
        shared: &[u8],
        ephemeral: &[u8],
        recipient: &EcPublicKey,
        sender: &EcPublicKey,
    ) -> Result<ChaCha20Poly1305> {
        let recipient = recipient.to_uncompressed();
        let sender = sender.to_uncompressed();

        let mut info = Vec::with_capacity(ephemeral.len() + recipient.len() + sender.len());
        info.extend_from_slice(ephemeral);
        info.extend_from_slice(&recipient);
        info.extend_from_slice(&sender);

        let key = hkdf_expand(shared, SIGNCRYPT_SALT, &info, CHACHA20_KEY_SIZE)?;
        ChaCha20Poly1305::new_from_slice(&key).map_err(|_| CoreError::Encryption {
            context: "Failed to create cipher".into(),
        })
    }

    fn signed_data(ephemeral: &[u8], ciphertext: &[u8], aad: &[u8], recipient: &EcPublicKey) -> Vec<u8> {
        let recipient = recipient.to_uncompressed();
        let mut data =
            Vec::with_capacity(ephemeral.len() + 8 + ciphertext.len() + aad.len() + recipient.len());
        data.extend_from_slice(ephemeral);
        data.extend_from_slice(&(ciphertext.len() as u64).to_le_bytes());
        data.extend_from_slice(ciphertext);
        data.extend_from_slice(aad);
        data.extend_from_slice(&recipient);
        data
    }
}

impl Signcrypter for DefaultSigncrypter {
    fn signcrypt(
        &self,
        sender: &EcPrivateKey,
        recipient: &EcPublicKey,
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<SigncryptionOutput> {
        let ephemeral = KeyPair::generate(recipient.curve(), &mut OsRng)?;
        let ephemeral_key = ephemeral.public().to_uncompressed();
        let shared = ephemeral.private().diffie_hellman(recipient)?;

        let cipher = Self::cipher(&shared[..], &ephemeral_key, recipient, &sender.public_key())?;
        let ciphertext = cipher
            .encrypt(
                &Nonce::from([0u8; CHACHA20_NONCE_SIZE]),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| CoreError::Encryption {
                context: "ChaCha20-Poly1305 encryption failed".into(),
            })?;

        let signature = sender.sign(&Self::signed_data(&ephemeral_key, &ciphertext, aad, recipient));

        Ok(SigncryptionOutput {
            ephemeral_key,
            ciphertext,
            signature,
        })
    }

    fn unsigncrypt(
        &self,
        sender: &EcPublicKey,
        recipient: &EcPrivateKey,
        aad: &[u8],
        output: &SigncryptionOutput,
    ) -> Result<Option<Vec<u8>>> {
        if sender.curve() != recipient.curve() {
            return Err(CoreError::KeyExchange {
                reason: format!("curve mismatch: {} vs {}", sender.curve(), recipient.curve()),
            });
        }

        let recipient_public = recipient.public_key();
        let signed = Self::signed_data(&output.ephemeral_key, &output.ciphertext, aad, &recipient_public);
        if sender.verify(&signed, &output.signature).is_err() {
            debug!("Signcrypted message rejected: bad signature");
            return Ok(None);
        }

        let Ok(ephemeral) = EcPublicKey::from_uncompressed(recipient.curve(), &output.ephemeral_key)
        else {
            debug!("Signcrypted message rejected: invalid ephemeral key");
            return Ok(None);
        };
        let shared = recipient.diffie_hellman(&ephemeral)?;

        let cipher = Self::cipher(&shared[..], &output.ephemeral_key, &recipient_public, sender)?;
        let plaintext = cipher
            .decrypt(
                &Nonce::from([0u8; CHACHA20_NONCE_SIZE]),
                Payload {
                    msg: &output.ciphertext,
                    aad,
                },
            )
            .ok();

        if plaintext.is_none() {
            debug!("Signcrypted message rejected: authentication tag mismatch");
        }
        Ok(plaintext)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Curve;

    struct Parties {
        sender: KeyPair,
        recipient: KeyPair,
    }

    fn parties() -> Parties {
        Parties {
            sender: KeyPair::generate(Curve::P256, &mut OsRng).unwrap(),
            recipient: KeyPair::generate(Curve::P256, &mut OsRng).unwrap(),
        }
    }

    fn seal(p: &Parties, plaintext: &[u8], aad: &[u8]) -> SigncryptionOutput {
        DefaultSigncrypter
            .signcrypt(p.sender.private(), p.recipient.public(), plaintext, aad)
            .unwrap()
    }

    fn open(p: &Parties, aad: &[u8], output: &SigncryptionOutput) -> Option<Vec<u8>> {
        DefaultSigncrypter
            .unsigncrypt(p.sender.public(), p.recipient.private(), aad, output)
            .unwrap()
    }

    #[test]
    fn test_signcrypt_roundtrip() {
        let p = parties();
        let output = seal(&p, b"segment payload", b"aad");

        assert_eq!(output.ciphertext.len(), 15 + SIGNCRYPT_OVERHEAD);
        assert_eq!(open(&p, b"aad", &output).as_deref(), Some(&b"segment payload"[..]));
    }

    #[test]
    fn test_empty_plaintext() {
        let p = parties();
        let output = seal(&p, b"", b"aad");
        assert_eq!(open(&p, b"aad", &output), Some(Vec::new()));
    }

    #[test]
    fn test_fresh_ephemeral_per_message() {
        let p = parties();
        let a = seal(&p, b"same", b"aad");
        let b = seal(&p, b"same", b"aad");
        assert_ne!(a.ephemeral_key, b.ephemeral_key);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_aad_rejected() {
        let p = parties();
        let output = seal(&p, b"data", b"counter-0");
        assert_eq!(open(&p, b"counter-1", &output), None);
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let p = parties();
        let mut output = seal(&p, b"data", b"aad");
        output.ciphertext[0] ^= 0x01;
        assert_eq!(open(&p, b"aad", &output), None);
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let p = parties();
        let mut output = seal(&p, b"data", b"aad");
        output.signature[10] ^= 0x80;
        assert_eq!(open(&p, b"aad", &output), None);
    }

    #[test]
    fn test_tampered_ephemeral_rejected() {
        let p = parties();
        let mut output = seal(&p, b"data", b"aad");
        output.ephemeral_key[20] ^= 0x01;
        assert_eq!(open(&p, b"aad", &output), None);
    }

    #[test]
    fn test_wrong_sender_rejected() {
        let p = parties();
        let impostor = KeyPair::generate(Curve::P256, &mut OsRng).unwrap();
        let output = DefaultSigncrypter
            .signcrypt(impostor.private(), p.recipient.public(), b"data", b"aad")
            .unwrap();
        assert_eq!(open(&p, b"aad", &output), None);
    }

    #[test]
    fn test_wrong_recipient_rejected() {
        let p = parties();
        let output = seal(&p, b"data", b"aad");
        let other = KeyPair::generate(Curve::P256, &mut OsRng).unwrap();
        let result = DefaultSigncrypter
            .unsigncrypt(p.sender.public(), other.private(), b"aad", &output)
            .unwrap();
        assert_eq!(result, None);
    }
}
