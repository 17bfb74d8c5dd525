// ============================================
// File: crates/stl-node/src/verifier.rs
// ============================================
//! # Allowlist Session Verifier
//!
//! ## Creation Reason
//! The transport leaves authorization to a `SessionVerifier`. The node
//! authorizes clients against certificates the operator placed in its
//! config, and optionally pins the tunnel every session must bind to.
//!
//! ## Decision Order
//! 1. Server key must be this node's own handshake key
//! 2. Client must be listed (unless the allowlist is empty: open mode)
//! 3. Listed client must present the listed handshake key
//! 4. With a pinned tunnel, tunnel id and key must match it
//!
//! ## ⚠️ Important Note for Next Developer
//! - Open mode accepts any client that proves possession of its own
//!   handshake key; use it for testing only
//!
//! ## Last Modified
//! v0.1.0 - Initial allowlist verifier

use std::collections::HashMap;

use tracing::{debug, info};

use stl_common::types::PeerId;
use stl_core::{Certificate, EcPublicKey, SessionVerifier};

/// Authorizes sessions against a fixed set of certificates.
#[derive(Debug, Clone)]
pub struct AllowlistVerifier {
    server_key: EcPublicKey,
    clients: HashMap<PeerId, EcPublicKey>,
    tunnel: Option<(PeerId, EcPublicKey)>,
}

impl AllowlistVerifier {
    /// Creates a verifier for the server holding `server_key`.
    #[must_use]
    pub fn new(server_key: EcPublicKey) -> Self {
        Self {
            server_key,
            clients: HashMap::new(),
            tunnel: None,
        }
    }

    /// Adds a client certificate to the allowlist.
    #[must_use]
    pub fn allow_client(mut self, cert: &Certificate) -> Self {
        self.clients.insert(cert.id().clone(), *cert.handshake_key());
        self
    }

    /// Requires every session to bind to `tunnel`.
    #[must_use]
    pub fn require_tunnel(mut self, tunnel: &Certificate) -> Self {
        self.tunnel = Some((tunnel.id().clone(), *tunnel.encryption_key()));
        self
    }

    /// Returns `true` if any client is accepted.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.clients.is_empty()
    }

    /// Returns the number of allowed clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn check(
        &self,
        client_id: &PeerId,
        client_handshake_key: &EcPublicKey,
        server_key: &EcPublicKey,
        tunnel_id: &PeerId,
        tunnel_key: &EcPublicKey,
    ) -> Result<(), &'static str> {
        if server_key != &self.server_key {
            return Err("server key mismatch");
        }

        if !self.is_open() {
            match self.clients.get(client_id) {
                None => return Err("client not allowed"),
                Some(key) if key != client_handshake_key => return Err("client key mismatch"),
                Some(_) => {}
            }
        }

        if let Some((id, key)) = &self.tunnel {
            if id != tunnel_id || key != tunnel_key {
                return Err("tunnel mismatch");
            }
        }

        Ok(())
    }
}

impl SessionVerifier for AllowlistVerifier {
    fn verify_session(
        &self,
        client_id: &PeerId,
        client_handshake_key: &EcPublicKey,
        server_key: &EcPublicKey,
        tunnel_id: &PeerId,
        tunnel_key: &EcPublicKey,
    ) -> bool {
        match self.check(client_id, client_handshake_key, server_key, tunnel_id, tunnel_key) {
            Ok(()) => {
                info!(client_id = %client_id, tunnel_id = %tunnel_id, "Session authorized");
                true
            }
            Err(reason) => {
                debug!(client_id = %client_id, tunnel_id = %tunnel_id, reason, "Session rejected");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;
    use stl_core::Curve;

    use super::*;

    fn cert(id: &str) -> Certificate {
        Certificate::generate(Curve::P256, &mut OsRng).unwrap().with_id(id)
    }

    fn ask(v: &AllowlistVerifier, client: &Certificate, server: &Certificate, tunnel: &Certificate) -> bool {
        v.verify_session(
            client.id(),
            client.handshake_key(),
            server.handshake_key(),
            tunnel.id(),
            tunnel.encryption_key(),
        )
    }

    #[test]
    fn test_listed_client_accepted() {
        let (client, server, tunnel) = (cert("alice"), cert("server"), cert("t1"));
        let v = AllowlistVerifier::new(*server.handshake_key()).allow_client(&client);
        assert!(ask(&v, &client, &server, &tunnel));
        assert!(!ask(&v, &cert("mallory"), &server, &tunnel));
    }

    #[test]
    fn test_impersonation_rejected() {
        let (client, server, tunnel) = (cert("alice"), cert("server"), cert("t1"));
        let v = AllowlistVerifier::new(*server.handshake_key()).allow_client(&client);

        // Same id, different key
        let impostor = cert("alice");
        assert!(!ask(&v, &impostor, &server, &tunnel));
    }

    #[test]
    fn test_open_mode() {
        let (server, tunnel) = (cert("server"), cert("t1"));
        let v = AllowlistVerifier::new(*server.handshake_key());
        assert!(v.is_open());
        assert!(ask(&v, &cert("anyone"), &server, &tunnel));
    }

    #[test]
    fn test_server_key_pinned() {
        let (client, server, tunnel) = (cert("alice"), cert("server"), cert("t1"));
        let v = AllowlistVerifier::new(*server.handshake_key());
        assert!(!ask(&v, &client, &cert("server"), &tunnel));
    }

    #[test]
    fn test_tunnel_pinned() {
        let (client, server, tunnel) = (cert("alice"), cert("server"), cert("t1"));
        let v = AllowlistVerifier::new(*server.handshake_key())
            .allow_client(&client)
            .require_tunnel(&tunnel);

        assert!(ask(&v, &client, &server, &tunnel));
        assert!(!ask(&v, &client, &server, &cert("t1")));
        assert!(!ask(&v, &client, &server, &cert("t2")));
    }
}
