// ============================================
// File: crates/stl-core/src/crypto/kdf.rs
// ============================================
//! # Key Derivation Functions
//!
//! ## Creation Reason
//! Turns the two handshake ECDH outputs into the session key, bound to
//! the full request transcript and the server's response key.
//!
//! ## Main Functionality
//! - `derive_session_key`: HKDF-SHA256 over the concatenated shared secrets
//! - `hkdf_expand`: Generic expansion used by the signcryption engine
//!
//! ## Derivation
//! ```text
//! ikm  = ECDH(server_eph, client_hs) || ECDH(server_eph, client_eph)
//! info = "stl-session-key" || h_req || len(server_id) u32 LE
//!        || server_id || server_eph_pub
//! key  = HKDF-SHA256(salt = "stl-v1", ikm, info)[0..32]
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Both handshake sides MUST call this with identical arguments
//! - Changing the info layout breaks interoperability with deployed peers
//!
//! ## Last Modified
//! v0.1.0 - Initial KDF implementation

use hkdf::Hkdf;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use super::{HKDF_INFO_PREFIX, HKDF_SALT, SESSION_KEY_SIZE};
use crate::crypto::SessionKey;
use crate::error::{CoreError, Result};

// ============================================
// Key Derivation
// ============================================

/// Derives the session key from the handshake key agreement.
///
/// # Arguments
/// * `static_secret` - ECDH(server ephemeral, client handshake key)
/// * `ephemeral_secret` - ECDH(server ephemeral, client ephemeral)
/// * `request_hash` - SHA-256 of the unsigned request encoding
/// * `server_id` - Server identity bytes
/// * `server_ephemeral` - Uncompressed server response public key
///
/// # Errors
/// Returns `KeyDerivation` if the server identity cannot be length-prefixed.
pub fn derive_session_key(
    static_secret: &[u8; 32],
    ephemeral_secret: &[u8; 32],
    request_hash: &[u8; 32],
    server_id: &[u8],
    server_ephemeral: &[u8],
) -> Result<SessionKey> {
    let id_len = u32::try_from(server_id.len()).map_err(|_| CoreError::KeyDerivation {
        reason: format!("server id too long: {} bytes", server_id.len()),
    })?;

    let mut ikm = Zeroizing::new([0u8; 64]);
    ikm[..32].copy_from_slice(static_secret);
    ikm[32..].copy_from_slice(ephemeral_secret);

    let mut info = Vec::with_capacity(
        HKDF_INFO_PREFIX.len() + request_hash.len() + 4 + server_id.len() + server_ephemeral.len(),
    );
    info.extend_from_slice(HKDF_INFO_PREFIX);
    info.extend_from_slice(request_hash);
    info.extend_from_slice(&id_len.to_le_bytes());
    info.extend_from_slice(server_id);
    info.extend_from_slice(server_ephemeral);

    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), &ikm[..]);
    let mut key_bytes = [0u8; SESSION_KEY_SIZE];
    hk.expand(&info, &mut key_bytes)
        .map_err(|_| CoreError::KeyDerivation {
            reason: "HKDF expansion failed".into(),
        })?;

    debug!(info_len = info.len(), "Session key derived");

    Ok(SessionKey::from_bytes(key_bytes))
}

/// Expands input keying material to `output_len` bytes.
///
/// # Errors
/// Returns `KeyDerivation` if `output_len` exceeds the HKDF-SHA256
/// maximum (255 * 32 bytes).
pub fn hkdf_expand(
    input: &[u8],
    salt: &[u8],
    info: &[u8],
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), input);

    let mut output = Zeroizing::new(vec![0u8; output_len]);
    hk.expand(info, &mut output)
        .map_err(|_| CoreError::KeyDerivation {
            reason: format!("HKDF expansion failed for {output_len} bytes"),
        })?;

    Ok(output)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(server_id: &[u8], server_eph: &[u8]) -> SessionKey {
        derive_session_key(&[0x11; 32], &[0x22; 32], &[0x33; 32], server_id, server_eph).unwrap()
    }

    #[test]
    fn test_derive_session_key_deterministic() {
        let key1 = derive(b"server", &[0x04; 65]);
        let key2 = derive(b"server", &[0x04; 65]);

        assert_eq!(key1, key2);
        assert_ne!(key1.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn test_derive_session_key_binds_transcript() {
        let base = derive(b"server", &[0x04; 65]);

        assert_ne!(base, derive(b"server-2", &[0x04; 65]));
        assert_ne!(base, derive(b"server", &[0x05; 65]));

        let other_hash =
            derive_session_key(&[0x11; 32], &[0x22; 32], &[0x34; 32], b"server", &[0x04; 65])
                .unwrap();
        assert_ne!(base, other_hash);
    }

    #[test]
    fn test_length_prefix_prevents_ambiguity() {
        // "ab" || "c..." and "a" || "bc..." must not collide
        let mut eph_a = vec![b'c'];
        eph_a.extend_from_slice(&[0x04; 64]);
        let mut eph_b = vec![b'b', b'c'];
        eph_b.extend_from_slice(&[0x04; 63]);

        assert_ne!(derive(b"ab", &eph_a), derive(b"a", &eph_b));
    }

    #[test]
    fn test_hkdf_expand() {
        let output = hkdf_expand(b"secret", b"salt", b"info", 64).unwrap();
        assert_eq!(output.len(), 64);

        let too_long = hkdf_expand(b"secret", b"salt", b"info", 255 * 32 + 1);
        assert!(matches!(too_long, Err(CoreError::KeyDerivation { .. })));
    }
}
