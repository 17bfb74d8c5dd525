// ============================================
// File: crates/stl-node/src/keystore.rs
// ============================================
//! # Certificate Files
//!
//! ## Creation Reason
//! Certificates are exchanged out of band. The node keeps them as small
//! JSON documents so operators can inspect identities and copy public
//! parts to peers.
//!
//! ## File Format
//! ```json
//! {
//!   "version": "1.0",
//!   "curve": "P-256",
//!   "id": "c2VydmVyLTAx",
//!   "handshake_key": "BN3k...",
//!   "encryption_key": "BAx1...",
//!   "handshake_private_key": "q8Zp...",
//!   "encryption_private_key": "0fYb...",
//!   "created_at": "1760572800Z"
//! }
//! ```
//! All binary fields are standard base64. Private key fields are omitted
//! from exported (public) certificates.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Files with private keys are written with mode 0600 on Unix
//! - Both private keys or neither; a half-private file is rejected
//!
//! ## Last Modified
//! v0.1.0 - Initial certificate file format

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tracing::debug;

use stl_common::types::PeerId;
use stl_core::{Certificate, Curve, EcPrivateKey, EcPublicKey, KeyPair};

use crate::error::{NodeError, Result};

/// Current certificate file format version.
pub const CERTIFICATE_FILE_VERSION: &str = "1.0";

// ============================================
// CertificateFile
// ============================================

/// On-disk certificate representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateFile {
    /// File format version
    pub version: String,
    /// Curve of every key in the file
    #[serde(default)]
    pub curve: Curve,
    /// Participant identity (base64)
    pub id: String,
    /// Handshake public key (base64, uncompressed point)
    pub handshake_key: EcPublicKey,
    /// Encryption public key (base64, uncompressed point)
    pub encryption_key: EcPublicKey,
    /// Handshake private scalar (base64)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handshake_private_key: Option<String>,
    /// Encryption private scalar (base64)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_private_key: Option<String>,
    /// Creation time, seconds since the Unix epoch
    #[serde(default)]
    pub created_at: String,
}

impl CertificateFile {
    /// Captures a certificate, including private keys if it holds them.
    #[must_use]
    pub fn from_certificate(cert: &Certificate) -> Self {
        let encode = |key: Option<&EcPrivateKey>| key.map(|k| BASE64.encode(k.to_bytes().as_slice()));

        Self {
            version: CERTIFICATE_FILE_VERSION.to_string(),
            curve: cert.curve(),
            id: cert.id().to_string(),
            handshake_key: *cert.handshake_key(),
            encryption_key: *cert.encryption_key(),
            handshake_private_key: encode(cert.handshake_private()),
            encryption_private_key: encode(cert.encryption_private()),
            created_at: unix_timestamp(),
        }
    }

    /// Rebuilds and validates the certificate.
    ///
    /// # Errors
    /// Returns `Common` if the identity is not valid base64, and `KeyFile`
    /// if a private key is malformed, only one private key is present, or
    /// the certificate fails validation.
    pub fn into_certificate(self, path: &Path) -> Result<Certificate> {
        let id: PeerId = self.id.parse()?;
        let decode = |field: &str, encoded: &str| -> Result<EcPrivateKey> {
            let bytes = BASE64
                .decode(encoded)
                .map_err(|e| NodeError::key_file(path, format!("{field}: {e}")))?;
            EcPrivateKey::from_bytes(self.curve, &bytes)
                .map_err(|e| NodeError::key_file(path, format!("{field}: {e}")))
        };

        let cert = match (&self.handshake_private_key, &self.encryption_private_key) {
            (Some(hs), Some(enc)) => {
                let handshake = KeyPair::from_private(decode("handshake_private_key", hs)?);
                let encryption = KeyPair::from_private(decode("encryption_private_key", enc)?);
                if handshake.public() != &self.handshake_key
                    || encryption.public() != &self.encryption_key
                {
                    return Err(NodeError::key_file(
                        path,
                        "private key does not match public key",
                    ));
                }
                Certificate::from_key_pairs(id, handshake, encryption)
            }
            (None, None) => Certificate::new(id, self.handshake_key, self.encryption_key),
            _ => {
                return Err(NodeError::key_file(
                    path,
                    "file must hold both private keys or neither",
                ))
            }
        };

        cert.validate()
            .map_err(|e| NodeError::key_file(path, e.to_string()))?;
        Ok(cert)
    }
}

// ============================================
// Load / Save
// ============================================

/// Loads a certificate from a JSON file.
///
/// # Errors
/// Returns `KeyFile` if the file cannot be read, parsed or validated, and
/// `Common` if the identity field is not base64.
pub fn load_certificate(path: impl AsRef<Path>) -> Result<Certificate> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| NodeError::key_file(path, e.to_string()))?;
    let file: CertificateFile = serde_json::from_str(&content)
        .map_err(|e| NodeError::key_file(path, e.to_string()))?;

    if file.version != CERTIFICATE_FILE_VERSION {
        return Err(NodeError::key_file(
            path,
            format!("unsupported version '{}'", file.version),
        ));
    }

    let cert = file.into_certificate(path)?;
    debug!(path = %path.display(), id = %cert.id(), private = cert.has_private_keys(), "Certificate loaded");
    Ok(cert)
}

/// Requires that a loaded certificate holds its private keys.
///
/// # Errors
/// Returns `KeyFile` if it does not.
pub fn load_private_certificate(path: impl AsRef<Path>) -> Result<Certificate> {
    let path = path.as_ref();
    let cert = load_certificate(path)?;
    if !cert.has_private_keys() {
        return Err(NodeError::key_file(path, "private keys required"));
    }
    Ok(cert)
}

/// Writes a certificate to a JSON file.
///
/// Parent directories are created as needed.
///
/// # Errors
/// Returns `Io` if the file cannot be written.
pub fn save_certificate(cert: &Certificate, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = CertificateFile::from_certificate(cert);
    let content = serde_json::to_string_pretty(&file)
        .map_err(|e| NodeError::key_file(path, e.to_string()))?;
    std::fs::write(path, content)?;

    // Set restrictive permissions on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if cert.has_private_keys() {
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }
    }

    Ok(())
}

/// Returns current timestamp as seconds since the epoch.
fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}Z", duration.as_secs())
}

// ============================================
// Tests
// ============================================
