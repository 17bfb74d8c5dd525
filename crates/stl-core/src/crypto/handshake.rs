// ============================================
// File: crates/stl-core/src/crypto/handshake.rs
// ============================================
//! # Handshake State Machines
//!
//! ## Creation Reason
//! Implements both sides of session establishment: the client builds and
//! signs a request, the server validates it, asks the injected
//! `SessionVerifier` for an authorization decision and answers with a
//! signed response. Both sides end up holding the same `SessionKey`.
//!
//! ## Main Functionality
//! - `SessionVerifier`: Authorization hook consulted by the server
//! - `ClientHandshaker`: `generate_request` then `process_server_response`
//! - `ServerHandshaker`: `process_request`
//!
//! ## Handshake Flow
//! ```text
//! Client                                          Server
//!   │                                               │
//!   │  HandshakeRequest                             │
//!   │  ├─ client_id, handshake key, encryption key  │
//!   │  ├─ client ephemeral key                      │
//!   │  ├─ server_id (expected)                      │
//!   │  ├─ tunnel_id, tunnel key                     │
//!   │  └─ signature (client handshake key) ───────► │
//!   │                                               │
//!   │                         Validate structure    │
//!   │                         Verify signature      │
//!   │                         SessionVerifier?      │
//!   │                         Generate ephemeral    │
//!   │                         Derive session key    │
//!   │                                               │
//!   │                           HandshakeResponse   │
//!   │  ◄──────────────── server_id, ephemeral key   │
//!   │                    signature (server key)     │
//!   │                                               │
//!   │  Verify signature                             │
//!   │  Derive session key                           │
//!   │                                               │
//!   │ ═════════════ Signcrypted Segments ══════════ │
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The client fails closed: any mismatch in the response yields
//!   `Ok(false)` and no key
//! - Ephemeral private keys are consumed by the first processing attempt
//! - Never log key material, only identities and outcomes
//!
//! ## Last Modified
//! v0.1.0 - Initial handshake implementation

use std::sync::Arc;

use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use stl_common::types::PeerId;
use tracing::{debug, info, warn};

use crate::crypto::kdf::derive_session_key;
use crate::crypto::keys::{Curve, EcPrivateKey, EcPublicKey, KeyPair, SessionKey};
use crate::error::{CoreError, Result};
use crate::protocol::{request_transcript, HandshakeRequest, HandshakeResponse, ProtocolVersion};

// ============================================
// SessionVerifier Trait
// ============================================

/// Authorization decision for an incoming handshake.
///
/// # Purpose
/// The server's sole authorization boundary. It sees the identities and
/// public keys bound into the request and answers yes or no.
///
/// # Contract
/// Implementations must be deterministic for a given input and must not
/// depend on session key material.
pub trait SessionVerifier: Send + Sync {
    /// Returns `true` to authorize the session.
    ///
    /// # Arguments
    /// * `client_id` - Identity claimed by the client
    /// * `client_handshake_key` - Key that signed the request
    /// * `server_key` - This server's long-term public key
    /// * `tunnel_id` - Tunnel identity bound into the request
    /// * `tunnel_key` - Tunnel public key bound into the request
    fn verify_session(
        &self,
        client_id: &PeerId,
        client_handshake_key: &EcPublicKey,
        server_key: &EcPublicKey,
        tunnel_id: &PeerId,
        tunnel_key: &EcPublicKey,
    ) -> bool;
}

impl<F> SessionVerifier for F
where
    F: Fn(&PeerId, &EcPublicKey, &EcPublicKey, &PeerId, &EcPublicKey) -> bool + Send + Sync,
{
    fn verify_session(
        &self,
        client_id: &PeerId,
        client_handshake_key: &EcPublicKey,
        server_key: &EcPublicKey,
        tunnel_id: &PeerId,
        tunnel_key: &EcPublicKey,
    ) -> bool {
        self(client_id, client_handshake_key, server_key, tunnel_id, tunnel_key)
    }
}

// ============================================
// Helpers
// ============================================

/// Data covered by the server signature.
fn response_sign_data(request_hash: &[u8; 32], server_id: &PeerId, ephemeral: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(request_hash.len() + server_id.len() + ephemeral.len());
    data.extend_from_slice(request_hash);
    data.extend_from_slice(server_id.as_bytes());
    data.extend_from_slice(ephemeral);
    data
}

fn require_curve(curve: Curve, key: &EcPublicKey, field: &str) -> Result<()> {
    if key.curve() == curve {
        Ok(())
    } else {
        Err(CoreError::validation(
            field,
            format!("key on {} but handshake configured for {curve}", key.curve()),
        ))
    }
}

fn require_id(id: &PeerId, field: &str) -> Result<()> {
    if id.is_empty() {
        Err(CoreError::validation(field, "identity cannot be empty"))
    } else {
        Ok(())
    }
}

// ============================================
// ClientHandshaker
// ============================================

/// Client side of the handshake.
///
/// # Lifecycle
/// 1. `generate_request` (exactly once)
/// 2. `process_server_response` (exactly once)
/// 3. `session_key` is `Some` iff step 2 returned `Ok(true)`
pub struct ClientHandshaker<R> {
    curve: Curve,
    rng: R,
    client_id: PeerId,
    handshake_keys: KeyPair,
    encryption_key: EcPublicKey,
    server_id: PeerId,
    server_key: EcPublicKey,
    tunnel_id: PeerId,
    tunnel_key: EcPublicKey,
    request_generated: bool,
    pending: Option<(KeyPair, [u8; 32])>,
    session_key: Option<SessionKey>,
}

impl<R> ClientHandshaker<R>
where
    R: RngCore + CryptoRng,
{
    /// Creates a client handshaker.
    ///
    /// # Errors
    /// Returns `Validation` if an identity is empty or a key is on a
    /// different curve than `curve`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        curve: Curve,
        rng: R,
        client_id: PeerId,
        handshake_keys: KeyPair,
        encryption_key: &EcPrivateKey,
        server_id: PeerId,
        server_key: EcPublicKey,
        tunnel_id: PeerId,
        tunnel_key: EcPublicKey,
    ) -> Result<Self> {
        require_id(&client_id, "client_id")?;
        require_id(&server_id, "server_id")?;
        require_id(&tunnel_id, "tunnel_id")?;
        require_curve(curve, handshake_keys.public(), "client_handshake_key")?;
        require_curve(curve, &encryption_key.public_key(), "client_encryption_key")?;
        require_curve(curve, &server_key, "server_key")?;
        require_curve(curve, &tunnel_key, "tunnel_key")?;

        Ok(Self {
            curve,
            rng,
            client_id,
            handshake_keys,
            encryption_key: encryption_key.public_key(),
            server_id,
            server_key,
            tunnel_id,
            tunnel_key,
            request_generated: false,
            pending: None,
            session_key: None,
        })
    }

    /// Builds and signs the handshake request.
    ///
    /// # Errors
    /// - `InvalidState`: called more than once
    /// - `KeyGeneration`: the randomness source failed
    pub fn generate_request(&mut self) -> Result<HandshakeRequest> {
        if self.request_generated {
            return Err(CoreError::invalid_state(
                "generate_request",
                "no request generated yet",
            ));
        }
        self.request_generated = true;

        let ephemeral = KeyPair::generate(self.curve, &mut self.rng)?;

        let mut request = HandshakeRequest::new(
            self.client_id.clone(),
            self.handshake_keys.public().to_uncompressed(),
            self.encryption_key.to_uncompressed(),
            ephemeral.public().to_uncompressed(),
            self.server_id.clone(),
            self.tunnel_id.clone(),
            self.tunnel_key.to_uncompressed(),
        );

        let transcript = request_transcript(&request);
        request.signature = self.handshake_keys.private().sign(&transcript);
        let request_hash: [u8; 32] = Sha256::digest(&transcript).into();

        self.pending = Some((ephemeral, request_hash));

        debug!(
            client_id = ?self.client_id,
            server_id = ?self.server_id,
            tunnel_id = ?self.tunnel_id,
            "Handshake request generated"
        );

        Ok(request)
    }

    /// Verifies the server response and derives the session key.
    ///
    /// # Returns
    /// - `Ok(true)`: response authentic, session key stored
    /// - `Ok(false)`: version, identity or signature mismatch
    ///
    /// # Errors
    /// - `InvalidState`: no pending request
    /// - `InvalidPublicKey`: signed response carries an invalid point
    pub fn process_server_response(&mut self, response: &HandshakeResponse) -> Result<bool> {
        let Some((ephemeral, request_hash)) = self.pending.take() else {
            return Err(CoreError::invalid_state(
                "process_server_response",
                "request generated and response pending",
            ));
        };

        if !ProtocolVersion::new(response.version).is_supported() {
            warn!(version = response.version, "Server response has unsupported version");
            return Ok(false);
        }

        if response.server_id != self.server_id {
            warn!(
                expected = ?self.server_id,
                got = ?response.server_id,
                "Server response identity mismatch"
            );
            return Ok(false);
        }

        let sign_data =
            response_sign_data(&request_hash, &response.server_id, &response.server_ephemeral_key);
        if self.server_key.verify(&sign_data, &response.signature).is_err() {
            warn!(server_id = ?self.server_id, "Server response signature invalid");
            return Ok(false);
        }

        let server_ephemeral =
            EcPublicKey::from_uncompressed(self.curve, &response.server_ephemeral_key)?;
        let static_secret = self.handshake_keys.private().diffie_hellman(&server_ephemeral)?;
        let ephemeral_secret = ephemeral.private().diffie_hellman(&server_ephemeral)?;

        let session_key = derive_session_key(
            &static_secret,
            &ephemeral_secret,
            &request_hash,
            response.server_id.as_bytes(),
            &response.server_ephemeral_key,
        )?;
        self.session_key = Some(session_key);

        info!(server_id = ?self.server_id, "Handshake complete (client)");
        Ok(true)
    }

    /// Returns the session key once the handshake succeeded.
    #[must_use]
    pub const fn session_key(&self) -> Option<&SessionKey> {
        self.session_key.as_ref()
    }

    /// Consumes the handshaker, returning the session key if any.
    #[must_use]
    pub fn into_session_key(self) -> Option<SessionKey> {
        self.session_key
    }
}

// ============================================
// ServerHandshaker
// ============================================

/// Server side of the handshake.
pub struct ServerHandshaker<R> {
    curve: Curve,
    rng: R,
    server_id: PeerId,
    signing_key: EcPrivateKey,
    verifier: Arc<dyn SessionVerifier>,
    client_encryption_key: Option<EcPublicKey>,
    session_key: Option<SessionKey>,
}

impl<R> ServerHandshaker<R>
where
    R: RngCore + CryptoRng,
{
    /// Creates a server handshaker.
    ///
    /// # Errors
    /// Returns `Validation` if the identity is empty or the signing key is
    /// on a different curve than `curve`.
    pub fn new(
        curve: Curve,
        rng: R,
        server_id: PeerId,
        signing_key: EcPrivateKey,
        verifier: Arc<dyn SessionVerifier>,
    ) -> Result<Self> {
        require_id(&server_id, "server_id")?;
        require_curve(curve, &signing_key.public_key(), "server_signing_key")?;

        Ok(Self {
            curve,
            rng,
            server_id,
            signing_key,
            verifier,
            client_encryption_key: None,
            session_key: None,
        })
    }

    /// Validates a request, consults the verifier and builds the response.
    ///
    /// # Returns
    /// - `Ok(Some(response))`: session authorized, key derived
    /// - `Ok(None)`: rejected by the `SessionVerifier`, no key derived
    ///
    /// # Errors
    /// - `InvalidState`: a session was already established
    /// - `UnsupportedVersion`, `Handshake`, `InvalidPublicKey`,
    ///   `SignatureVerification`: structurally invalid request
    /// - `KeyGeneration`: the randomness source failed
    pub fn process_request(
        &mut self,
        request: &HandshakeRequest,
    ) -> Result<Option<HandshakeResponse>> {
        if self.session_key.is_some() {
            return Err(CoreError::invalid_state("process_request", "no session established"));
        }

        if !ProtocolVersion::new(request.version).is_supported() {
            return Err(CoreError::UnsupportedVersion {
                got: request.version,
                expected: ProtocolVersion::current().as_u8(),
            });
        }
        if request.client_id.is_empty() {
            return Err(CoreError::handshake("empty client identity"));
        }
        if request.tunnel_id.is_empty() {
            return Err(CoreError::handshake("empty tunnel identity"));
        }
        if request.server_id != self.server_id {
            return Err(CoreError::handshake(format!(
                "request addressed to {:?}, this server is {:?}",
                request.server_id, self.server_id
            )));
        }

        let client_handshake_key =
            EcPublicKey::from_uncompressed(self.curve, &request.client_handshake_key)?;
        let client_encryption_key =
            EcPublicKey::from_uncompressed(self.curve, &request.client_encryption_key)?;
        let client_ephemeral_key =
            EcPublicKey::from_uncompressed(self.curve, &request.client_ephemeral_key)?;
        let tunnel_key = EcPublicKey::from_uncompressed(self.curve, &request.tunnel_key)?;

        let transcript = request_transcript(request);
        client_handshake_key.verify(&transcript, &request.signature)?;
        let request_hash: [u8; 32] = Sha256::digest(&transcript).into();

        let server_key = self.signing_key.public_key();
        let authorized = self.verifier.verify_session(
            &request.client_id,
            &client_handshake_key,
            &server_key,
            &request.tunnel_id,
            &tunnel_key,
        );
        if !authorized {
            info!(
                client_id = ?request.client_id,
                tunnel_id = ?request.tunnel_id,
                "Session rejected by verifier"
            );
            return Ok(None);
        }

        let ephemeral = KeyPair::generate(self.curve, &mut self.rng)?;
        let ephemeral_bytes = ephemeral.public().to_uncompressed();
        let static_secret = ephemeral.private().diffie_hellman(&client_handshake_key)?;
        let ephemeral_secret = ephemeral.private().diffie_hellman(&client_ephemeral_key)?;

        let session_key = derive_session_key(
            &static_secret,
            &ephemeral_secret,
            &request_hash,
            self.server_id.as_bytes(),
            &ephemeral_bytes,
        )?;

        let mut response = HandshakeResponse::new(self.server_id.clone(), ephemeral_bytes);
        response.signature = self.signing_key.sign(&response_sign_data(
            &request_hash,
            &self.server_id,
            &response.server_ephemeral_key,
        ));

        self.session_key = Some(session_key);
        self.client_encryption_key = Some(client_encryption_key);

        info!(
            client_id = ?request.client_id,
            tunnel_id = ?request.tunnel_id,
            "Handshake complete (server)"
        );

        Ok(Some(response))
    }

    /// Returns the session key once a request was authorized.
    #[must_use]
    pub const fn session_key(&self) -> Option<&SessionKey> {
        self.session_key.as_ref()
    }

    /// Returns the client's long-term encryption key from the request.
    #[must_use]
    pub const fn client_encryption_key(&self) -> Option<&EcPublicKey> {
        self.client_encryption_key.as_ref()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rand::rngs::OsRng;

    use super::*;

    struct Fixture {
        client_hs: KeyPair,
        client_enc: KeyPair,
        server_sign: KeyPair,
        tunnel: KeyPair,
    }

    impl Fixture {
        fn new() -> Self {
            let generate = || KeyPair::generate(Curve::P256, &mut OsRng).unwrap();
            Self {
                client_hs: generate(),
                client_enc: generate(),
                server_sign: generate(),
                tunnel: generate(),
            }
        }

        fn client(&self) -> ClientHandshaker<OsRng> {
            ClientHandshaker::new(
                Curve::P256,
                OsRng,
                PeerId::from("client"),
                self.client_hs.clone(),
                self.client_enc.private(),
                PeerId::from("server"),
                *self.server_sign.public(),
                PeerId::from("tunnel"),
                *self.tunnel.public(),
            )
            .unwrap()
        }

        fn server(&self, verifier: Arc<dyn SessionVerifier>) -> ServerHandshaker<OsRng> {
            ServerHandshaker::new(
                Curve::P256,
                OsRng,
                PeerId::from("server"),
                self.server_sign.private().clone(),
                verifier,
            )
            .unwrap()
        }
    }

    fn allow_all() -> Arc<dyn SessionVerifier> {
        Arc::new(|_: &PeerId, _: &EcPublicKey, _: &EcPublicKey, _: &PeerId, _: &EcPublicKey| true)
    }

    fn deny_all() -> Arc<dyn SessionVerifier> {
        Arc::new(|_: &PeerId, _: &EcPublicKey, _: &EcPublicKey, _: &PeerId, _: &EcPublicKey| false)
    }

    #[test]
    fn test_handshake_symmetry() {
        let fx = Fixture::new();
        let mut client = fx.client();
        let mut server = fx.server(allow_all());

        let request = client.generate_request().unwrap();
        let response = server.process_request(&request).unwrap().unwrap();
        assert!(client.process_server_response(&response).unwrap());

        assert_eq!(client.session_key(), server.session_key());
        assert!(client.session_key().is_some());
        assert_eq!(server.client_encryption_key(), Some(fx.client_enc.public()));
    }

    #[test]
    fn test_independent_handshakes_yield_distinct_keys() {
        let fx = Fixture::new();
        let run = || {
            let mut client = fx.client();
            let mut server = fx.server(allow_all());
            let request = client.generate_request().unwrap();
            let response = server.process_request(&request).unwrap().unwrap();
            client.process_server_response(&response).unwrap();
            client.into_session_key().unwrap()
        };
        assert_ne!(run(), run());
    }

    #[test]
    fn test_generate_request_only_once() {
        let fx = Fixture::new();
        let mut client = fx.client();
        client.generate_request().unwrap();
        assert!(matches!(
            client.generate_request(),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_response_before_request_is_state_error() {
        let fx = Fixture::new();
        let mut client = fx.client();
        let response = HandshakeResponse::new(PeerId::from("server"), vec![0x04; 65]);
        assert!(matches!(
            client.process_server_response(&response),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_verifier_sees_request_bindings() {
        let fx = Fixture::new();
        let seen: Arc<Mutex<Vec<(PeerId, EcPublicKey, EcPublicKey, PeerId, EcPublicKey)>>> =
            Arc::default();
        let recorder = Arc::clone(&seen);
        let verifier: Arc<dyn SessionVerifier> = Arc::new(
            move |id: &PeerId, hs: &EcPublicKey, srv: &EcPublicKey, tid: &PeerId, tk: &EcPublicKey| {
                recorder
                    .lock()
                    .unwrap()
                    .push((id.clone(), *hs, *srv, tid.clone(), *tk));
                true
            },
        );

        let mut client = fx.client();
        let mut server = fx.server(verifier);
        let request = client.generate_request().unwrap();
        server.process_request(&request).unwrap().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (id, hs, srv, tid, tk) = &seen[0];
        assert_eq!(id, &PeerId::from("client"));
        assert_eq!(hs, fx.client_hs.public());
        assert_eq!(srv, fx.server_sign.public());
        assert_eq!(tid, &PeerId::from("tunnel"));
        assert_eq!(tk, fx.tunnel.public());
    }

    #[test]
    fn test_verifier_rejection_derives_no_key() {
        let fx = Fixture::new();
        let mut client = fx.client();
        let mut server = fx.server(deny_all());

        let request = client.generate_request().unwrap();
        assert!(server.process_request(&request).unwrap().is_none());
        assert!(server.session_key().is_none());
        assert!(server.client_encryption_key().is_none());
        assert!(client.session_key().is_none());
    }

    #[test]
    fn test_tampered_request_signature_rejected() {
        let fx = Fixture::new();
        let mut client = fx.client();
        let mut server = fx.server(allow_all());

        let mut request = client.generate_request().unwrap();
        request.tunnel_id = PeerId::from("other-tunnel");

        let result = server.process_request(&request);
        assert!(matches!(result, Err(CoreError::SignatureVerification)));
        assert!(server.session_key().is_none());
    }

    #[test]
    fn test_request_for_other_server_rejected() {
        let fx = Fixture::new();
        let mut client = fx.client();
        let mut server = ServerHandshaker::new(
            Curve::P256,
            OsRng,
            PeerId::from("someone-else"),
            fx.server_sign.private().clone(),
            allow_all(),
        )
        .unwrap();

        let request = client.generate_request().unwrap();
        assert!(matches!(
            server.process_request(&request),
            Err(CoreError::Handshake { .. })
        ));
    }

    #[test]
    fn test_request_with_invalid_point_rejected() {
        let fx = Fixture::new();
        let mut client = fx.client();
        let mut server = fx.server(allow_all());

        let mut request = client.generate_request().unwrap();
        request.client_ephemeral_key = vec![0x04; 65];
        assert!(matches!(
            server.process_request(&request),
            Err(CoreError::InvalidPublicKey { .. })
        ));
    }

    #[test]
    fn test_response_signature_mismatch_fails_closed() {
        let fx = Fixture::new();
        let mut client = fx.client();
        let mut server = fx.server(allow_all());

        let request = client.generate_request().unwrap();
        let mut response = server.process_request(&request).unwrap().unwrap();
        response.signature[0] ^= 0x01;

        assert!(!client.process_server_response(&response).unwrap());
        assert!(client.session_key().is_none());
    }

    #[test]
    fn test_response_from_impostor_fails_closed() {
        let fx = Fixture::new();
        let impostor = Fixture::new();
        let mut client = fx.client();

        // Same identity, different signing key
        let mut server = impostor.server(allow_all());
        let request = client.generate_request().unwrap();
        let response = server.process_request(&request).unwrap().unwrap();

        assert!(!client.process_server_response(&response).unwrap());
        assert!(client.session_key().is_none());
    }

    #[test]
    fn test_response_identity_or_version_mismatch_fails_closed() {
        let fx = Fixture::new();

        let mut client = fx.client();
        let mut server = fx.server(allow_all());
        let request = client.generate_request().unwrap();
        let mut response = server.process_request(&request).unwrap().unwrap();
        response.server_id = PeerId::from("not-the-server");
        assert!(!client.process_server_response(&response).unwrap());

        let mut client = fx.client();
        let mut server = fx.server(allow_all());
        let request = client.generate_request().unwrap();
        let mut response = server.process_request(&request).unwrap().unwrap();
        response.version = 0x09;
        assert!(!client.process_server_response(&response).unwrap());
        assert!(client.session_key().is_none());
    }

    #[test]
    fn test_second_request_after_success_is_state_error() {
        let fx = Fixture::new();
        let mut client = fx.client();
        let mut server = fx.server(allow_all());
        let request = client.generate_request().unwrap();
        server.process_request(&request).unwrap().unwrap();

        assert!(matches!(
            server.process_request(&request),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_empty_identity_rejected_at_construction() {
        let fx = Fixture::new();
        let result = ClientHandshaker::new(
            Curve::P256,
            OsRng,
            PeerId::default(),
            fx.client_hs.clone(),
            fx.client_enc.private(),
            PeerId::from("server"),
            *fx.server_sign.public(),
            PeerId::from("tunnel"),
            *fx.tunnel.public(),
        );
        assert!(matches!(result, Err(CoreError::Validation { .. })));
    }
}
