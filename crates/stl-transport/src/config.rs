// ============================================
// File: crates/stl-transport/src/config.rs
// ============================================
//! # Connection Configuration
//!
//! ## Creation Reason
//! Collects everything one side of a connection needs before the
//! handshake: its own keys and identity, what it expects of the peer, and
//! (server side) the authorization hook.
//!
//! ## Main Functionality
//! - `ClientConfig`: Client identity, keys, expected server, tunnel binding
//! - `ServerConfig`: Server identity, keys, `SessionVerifier`
//! - `from_certificates` / `from_certificate` constructors
//! - `validate()` checks run before any bytes hit the wire
//!
//! ## ⚠️ Important Note for Next Developer
//! - Configs hold private keys; `Debug` prints identities only
//! - The verifier is shared (`Arc`) so one `ServerConfig` can serve many
//!   connections
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration types

use std::fmt;
use std::sync::Arc;

use stl_common::types::PeerId;
use stl_core::{Certificate, Curve, EcPrivateKey, EcPublicKey, KeyPair, SessionVerifier};

use crate::error::{Result, TransportError};

// ============================================
// ClientConfig
// ============================================

/// Client side configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Curve shared by every key below
    pub curve: Curve,
    /// Client identity
    pub client_id: PeerId,
    /// Key pair that signs the handshake request
    pub handshake_keys: KeyPair,
    /// Long-term key used for signcryption
    pub encryption_key: EcPrivateKey,
    /// Expected server identity
    pub server_id: PeerId,
    /// Expected server signing key
    pub server_handshake_key: EcPublicKey,
    /// Server key that segments are encrypted to
    pub server_encryption_key: EcPublicKey,
    /// Tunnel identity bound into the handshake
    pub tunnel_id: PeerId,
    /// Tunnel key bound into the handshake
    pub tunnel_key: EcPublicKey,
}

impl ClientConfig {
    /// Builds a client config from certificates.
    ///
    /// The client certificate must hold both private keys. The tunnel is
    /// bound by its identity and encryption key.
    ///
    /// # Errors
    /// Returns `Config` if a certificate is invalid or the client
    /// certificate lacks private keys.
    pub fn from_certificates(
        client: &Certificate,
        server: &Certificate,
        tunnel: &Certificate,
    ) -> Result<Self> {
        for (name, cert) in [("client", client), ("server", server), ("tunnel", tunnel)] {
            cert.validate()
                .map_err(|e| TransportError::config(name, e.to_string()))?;
        }

        let (Some(handshake_keys), Some(encryption_key)) =
            (client.handshake_key_pair(), client.encryption_private().cloned())
        else {
            return Err(TransportError::config(
                "client",
                "certificate has no private keys",
            ));
        };

        let config = Self {
            curve: client.curve(),
            client_id: client.id().clone(),
            handshake_keys,
            encryption_key,
            server_id: server.id().clone(),
            server_handshake_key: *server.handshake_key(),
            server_encryption_key: *server.encryption_key(),
            tunnel_id: tunnel.id().clone(),
            tunnel_key: *tunnel.encryption_key(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `Config` if an identity is empty or a key is on the wrong curve.
    pub fn validate(&self) -> Result<()> {
        for (field, id) in [
            ("client_id", &self.client_id),
            ("server_id", &self.server_id),
            ("tunnel_id", &self.tunnel_id),
        ] {
            if id.is_empty() {
                return Err(TransportError::config(field, "cannot be empty"));
            }
        }

        let keys = [
            ("handshake_keys", self.handshake_keys.curve()),
            ("encryption_key", self.encryption_key.curve()),
            ("server_handshake_key", self.server_handshake_key.curve()),
            ("server_encryption_key", self.server_encryption_key.curve()),
            ("tunnel_key", self.tunnel_key.curve()),
        ];
        for (field, curve) in keys {
            if curve != self.curve {
                return Err(TransportError::config(
                    field,
                    format!("key on {curve}, config uses {}", self.curve),
                ));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("curve", &self.curve)
            .field("client_id", &self.client_id)
            .field("server_id", &self.server_id)
            .field("tunnel_id", &self.tunnel_id)
            .finish_non_exhaustive()
    }
}

// ============================================
// ServerConfig
// ============================================

/// Server side configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Curve shared by every key below
    pub curve: Curve,
    /// Server identity
    pub server_id: PeerId,
    /// Key that signs handshake responses
    pub signing_key: EcPrivateKey,
    /// Long-term key used for signcryption
    pub encryption_key: EcPrivateKey,
    /// Authorization hook
    pub verifier: Arc<dyn SessionVerifier>,
}

impl ServerConfig {
    /// Builds a server config from the server certificate.
    ///
    /// # Errors
    /// Returns `Config` if the certificate is invalid or lacks private keys.
    pub fn from_certificate(
        server: &Certificate,
        verifier: Arc<dyn SessionVerifier>,
    ) -> Result<Self> {
        server
            .validate()
            .map_err(|e| TransportError::config("server", e.to_string()))?;

        let (Some(signing_key), Some(encryption_key)) = (
            server.handshake_private().cloned(),
            server.encryption_private().cloned(),
        ) else {
            return Err(TransportError::config(
                "server",
                "certificate has no private keys",
            ));
        };

        let config = Self {
            curve: server.curve(),
            server_id: server.id().clone(),
            signing_key,
            encryption_key,
            verifier,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `Config` if the identity is empty or a key is on the wrong curve.
    pub fn validate(&self) -> Result<()> {
        if self.server_id.is_empty() {
            return Err(TransportError::config("server_id", "cannot be empty"));
        }
        for (field, curve) in [
            ("signing_key", self.signing_key.curve()),
            ("encryption_key", self.encryption_key.curve()),
        ] {
            if curve != self.curve {
                return Err(TransportError::config(
                    field,
                    format!("key on {curve}, config uses {}", self.curve),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("curve", &self.curve)
            .field("server_id", &self.server_id)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;

    fn cert(id: &str) -> Certificate {
        Certificate::generate(Curve::P256, &mut OsRng).unwrap().with_id(id)
    }

    fn allow_all() -> Arc<dyn SessionVerifier> {
        Arc::new(|_: &PeerId, _: &EcPublicKey, _: &EcPublicKey, _: &PeerId, _: &EcPublicKey| true)
    }

    #[test]
    fn test_client_config_from_certificates() {
        let (client, server, tunnel) = (cert("client"), cert("server"), cert("tunnel"));
        let config = ClientConfig::from_certificates(&client, &server.public_only(), &tunnel)
            .unwrap();

        assert_eq!(config.client_id, PeerId::from("client"));
        assert_eq!(&config.server_encryption_key, server.encryption_key());
        assert_eq!(&config.tunnel_key, tunnel.encryption_key());
    }

    #[test]
    fn test_client_config_requires_private_keys() {
        let client = cert("client").public_only();
        let result = ClientConfig::from_certificates(&client, &cert("server"), &cert("tunnel"));
        assert!(matches!(result, Err(TransportError::Config { .. })));
    }

    #[test]
    fn test_client_config_rejects_blank_ids() {
        let blank = Certificate::generate(Curve::P256, &mut OsRng).unwrap();
        let result = ClientConfig::from_certificates(&cert("client"), &cert("server"), &blank);
        assert!(matches!(result, Err(TransportError::Config { .. })));
    }

    #[test]
    fn test_server_config_from_certificate() {
        let server = cert("server");
        let config = ServerConfig::from_certificate(&server, allow_all()).unwrap();
        assert_eq!(config.server_id, PeerId::from("server"));

        let result = ServerConfig::from_certificate(&server.public_only(), allow_all());
        assert!(matches!(result, Err(TransportError::Config { .. })));
    }

    #[test]
    fn test_debug_hides_keys() {
        let config = ServerConfig::from_certificate(&cert("server"), allow_all()).unwrap();
        let debug = format!("{config:?}");
        assert!(debug.contains("server_id"));
        assert!(!debug.contains("signing_key"));
    }
}
