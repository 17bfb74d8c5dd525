// ============================================
// File: crates/stl-transport/src/conn.rs
// ============================================
//! # Secure Connection
//!
//! ## Creation Reason
//! `Conn` turns any ordered byte stream into an authenticated, encrypted
//! stream: it runs the handshake, then cuts application data into
//! segments, signcrypts each one with a counter-bound associated data and
//! frames it onto the wire.
//!
//! ## Main Functionality
//! - `Conn::client` / `Conn::server`: Wrap a stream with a config
//! - `handshake()`: Idempotent session establishment
//! - `send()` / `recv()`: Segmented data path
//! - `std::io::Read` / `std::io::Write` over `recv` / `send`
//!
//! ## Segment Pipeline
//! ```text
//! send(buf)
//!   │  split into ≤ 16384-byte chunks
//!   ▼
//! AAD = session_key || write_counter (u64 LE)
//!   │
//!   ▼
//! signcrypt(own key, peer key, chunk, AAD) ──► Segment ──► frame ──► stream
//!
//! stream ──► frame ──► Segment
//!   │
//!   ▼
//! AAD = session_key || read_counter (u64 LE)
//!   │
//!   ▼
//! unsigncrypt ──► plaintext queue ──► recv(buf)
//! ```
//!
//! ## State Machine
//! ```text
//! Fresh ──handshake──► Established ──clean EOF──► Closed
//!   │                       │
//!   └──── any error ────────┴──────► Failed (terminal)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Counters are never on the wire; a dropped, duplicated or reordered
//!   segment fails the next integrity check
//! - Counters never wrap; exhaustion is an error
//! - `recv` fetches at most one non-empty segment per call when its queue
//!   is empty
//! - Writing to a `Closed` connection is allowed; only the read side saw EOF
//!
//! ## Last Modified
//! v0.1.0 - Initial secure connection

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use rand::rngs::OsRng;
use stl_core::crypto::signcrypt::{DefaultSigncrypter, Signcrypter};
use stl_core::protocol::{decode_message, encode_message};
use stl_core::{
    ClientHandshaker, CoreError, EcPrivateKey, EcPublicKey, HandshakeRequest, HandshakeResponse,
    Segment, ServerHandshaker, SessionKey,
};
use tracing::{debug, info, trace, warn};

use crate::config::{ClientConfig, ServerConfig};
use crate::error::{Result, Stage, TransportError};
use crate::framing::{read_frame, write_frame};

// ============================================
// Constants
// ============================================

/// Largest plaintext carried by one segment.
pub const MAX_SEGMENT_SIZE: usize = 16384;

// ============================================
// Role & State
// ============================================

/// Which side of the handshake this connection plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sends the handshake request.
    Client,
    /// Answers the handshake request.
    Server,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
        }
    }
}

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnState {
    /// Handshake not yet completed.
    Fresh,
    /// Session key agreed; data may flow.
    Established,
    /// Peer closed the stream at a frame boundary.
    Closed,
    /// An error occurred; the connection is unusable.
    Failed,
}

enum Side {
    Client(Arc<ClientConfig>),
    Server(Arc<ServerConfig>),
}

// ============================================
// Conn
// ============================================

/// Secure connection over a byte stream `S`.
///
/// # Example
/// ```no_run
/// use std::net::TcpStream;
/// use std::sync::Arc;
/// # fn run(config: stl_transport::ClientConfig) -> stl_transport::Result<()> {
/// use stl_transport::Conn;
///
/// let stream = TcpStream::connect("127.0.0.1:7400").map_err(|e| {
///     stl_transport::TransportError::io(stl_transport::Stage::HandshakeRequest, e)
/// })?;
/// let mut conn = Conn::client(stream, Arc::new(config));
/// conn.handshake()?;
/// conn.send(b"hello")?;
/// # Ok(())
/// # }
/// ```
pub struct Conn<S> {
    stream: S,
    side: Side,
    state: ConnState,
    session_key: Option<SessionKey>,
    own_key: EcPrivateKey,
    peer_key: Option<EcPublicKey>,
    signcrypter: Box<dyn Signcrypter>,
    written_segments: u64,
    read_segments: u64,
    read_buf: BytesMut,
}

impl<S> Conn<S>
where
    S: Read + Write,
{
    /// Wraps `stream` as the client side.
    pub fn client(stream: S, config: Arc<ClientConfig>) -> Self {
        let own_key = config.encryption_key.clone();
        let peer_key = Some(config.server_encryption_key);
        Self::new(stream, Side::Client(config), own_key, peer_key)
    }

    /// Wraps `stream` as the server side.
    ///
    /// The peer key is learned from the handshake request.
    pub fn server(stream: S, config: Arc<ServerConfig>) -> Self {
        let own_key = config.encryption_key.clone();
        Self::new(stream, Side::Server(config), own_key, None)
    }

    fn new(stream: S, side: Side, own_key: EcPrivateKey, peer_key: Option<EcPublicKey>) -> Self {
        Self {
            stream,
            side,
            state: ConnState::Fresh,
            session_key: None,
            own_key,
            peer_key,
            signcrypter: Box::new(DefaultSigncrypter::new()),
            written_segments: 0,
            read_segments: 0,
            read_buf: BytesMut::new(),
        }
    }

    /// Replaces the signcryption engine.
    ///
    /// Must be called before the first segment is exchanged; both peers
    /// need compatible engines.
    #[must_use]
    pub fn with_signcrypter<C>(mut self, signcrypter: C) -> Self
    where
        C: Signcrypter + 'static,
    {
        self.signcrypter = Box::new(signcrypter);
        self
    }

    // ========================================
    // Handshake
    // ========================================

    /// Runs the handshake if it has not completed yet.
    ///
    /// # Errors
    /// - `Failed`: the connection failed earlier
    /// - `Io`, `FrameTooLarge`, `Decode`: stream or wire errors
    /// - `Handshake`: verification failed or the peer closed early
    /// - `Rejected` (server): the `SessionVerifier` refused the client
    ///
    /// Any error leaves the connection `Failed` with no session key.
    pub fn handshake(&mut self) -> Result<()> {
        if self.session_key.is_some() {
            return Ok(());
        }
        if self.state == ConnState::Failed {
            return Err(TransportError::Failed);
        }

        let result = match &self.side {
            Side::Client(config) => {
                let config = Arc::clone(config);
                self.handshake_as_client(&config)
            }
            Side::Server(config) => {
                let config = Arc::clone(config);
                self.handshake_as_server(&config)
            }
        };

        match result {
            Ok((session_key, peer_key)) => {
                self.session_key = Some(session_key);
                self.peer_key = Some(peer_key);
                self.state = ConnState::Established;
                info!(role = %self.role(), "Secure connection established");
                Ok(())
            }
            Err(e) => {
                warn!(role = %self.role(), error = %e, "Handshake failed");
                self.state = ConnState::Failed;
                Err(e)
            }
        }
    }

    fn handshake_as_client(&mut self, config: &ClientConfig) -> Result<(SessionKey, EcPublicKey)> {
        let mut handshaker = ClientHandshaker::new(
            config.curve,
            OsRng,
            config.client_id.clone(),
            config.handshake_keys.clone(),
            &config.encryption_key,
            config.server_id.clone(),
            config.server_handshake_key,
            config.tunnel_id.clone(),
            config.tunnel_key,
        )
        .map_err(|e| TransportError::handshake(Stage::HandshakeRequest, e))?;

        let request = handshaker
            .generate_request()
            .map_err(|e| TransportError::handshake(Stage::HandshakeRequest, e))?;
        write_frame(&mut self.stream, &encode_message(&request), Stage::HandshakeRequest)?;
        self.stream
            .flush()
            .map_err(|e| TransportError::io(Stage::HandshakeRequest, e))?;
        debug!(server_id = ?config.server_id, "Handshake request sent");

        let stage = Stage::HandshakeResponse;
        let Some(frame) = read_frame(&mut self.stream, stage)? else {
            return Err(TransportError::handshake(
                stage,
                CoreError::handshake("peer closed the connection before responding"),
            ));
        };
        let response: HandshakeResponse =
            decode_message(&frame).map_err(|source| TransportError::Decode { stage, source })?;

        let verified = handshaker
            .process_server_response(&response)
            .map_err(|e| TransportError::handshake(stage, e))?;
        if !verified {
            return Err(TransportError::handshake(
                stage,
                CoreError::handshake("server response failed verification"),
            ));
        }

        let session_key = handshaker.into_session_key().ok_or_else(|| {
            TransportError::handshake(stage, CoreError::handshake("no session key derived"))
        })?;
        Ok((session_key, config.server_encryption_key))
    }

    fn handshake_as_server(&mut self, config: &ServerConfig) -> Result<(SessionKey, EcPublicKey)> {
        let stage = Stage::HandshakeRequest;
        let Some(frame) = read_frame(&mut self.stream, stage)? else {
            return Err(TransportError::handshake(
                stage,
                CoreError::handshake("peer closed the connection before sending a request"),
            ));
        };
        let request: HandshakeRequest =
            decode_message(&frame).map_err(|source| TransportError::Decode { stage, source })?;
        debug!(client_id = ?request.client_id, "Handshake request received");

        let mut handshaker = ServerHandshaker::new(
            config.curve,
            OsRng,
            config.server_id.clone(),
            config.signing_key.clone(),
            Arc::clone(&config.verifier),
        )
        .map_err(|e| TransportError::handshake(stage, e))?;

        let Some(response) = handshaker
            .process_request(&request)
            .map_err(|e| TransportError::handshake(stage, e))?
        else {
            return Err(TransportError::Rejected {
                client_id: request.client_id,
            });
        };

        let stage = Stage::HandshakeResponse;
        let (Some(session_key), Some(peer_key)) = (
            handshaker.session_key().cloned(),
            handshaker.client_encryption_key().copied(),
        ) else {
            return Err(TransportError::handshake(
                stage,
                CoreError::handshake("no session key derived"),
            ));
        };

        write_frame(&mut self.stream, &encode_message(&response), stage)?;
        self.stream
            .flush()
            .map_err(|e| TransportError::io(stage, e))?;

        Ok((session_key, peer_key))
    }

    // ========================================
    // Data Path
    // ========================================

    /// Encrypts and writes `buf` as one or more segments.
    ///
    /// # Returns
    /// Number of bytes consumed (all of `buf` on success).
    ///
    /// # Errors
    /// - `NotEstablished`: handshake not completed
    /// - `Failed`: the connection failed earlier
    /// - Any data-path error, after which the connection is `Failed`.
    ///   Segments written before the error are not rolled back.
    pub fn send(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_usable()?;

        let mut written = 0;
        for chunk in buf.chunks(MAX_SEGMENT_SIZE) {
            if let Err(e) = self.write_segment(chunk) {
                self.fail(&e);
                return Err(e);
            }
            written += chunk.len();
        }
        Ok(written)
    }

    /// Reads decrypted application data into `buf`.
    ///
    /// # Returns
    /// Number of bytes copied. `0` means the peer closed the stream, or
    /// `buf` is empty.
    ///
    /// # Errors
    /// - `NotEstablished`: handshake not completed
    /// - `Failed`: the connection failed earlier
    /// - `Integrity { segment }`: a segment failed authentication
    /// - Any other data-path error, after which the connection is `Failed`
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_usable()?;
        if buf.is_empty() {
            return Ok(0);
        }

        // A peer may send empty segments; keep reading so that 0 only means EOF
        while self.read_buf.is_empty() && self.state == ConnState::Established {
            match self.read_segment() {
                Ok(true) => {}
                Ok(false) => {
                    debug!(
                        role = %self.role(),
                        segments = self.read_segments,
                        "Peer closed the stream"
                    );
                    self.state = ConnState::Closed;
                }
                Err(e) => {
                    self.fail(&e);
                    return Err(e);
                }
            }
        }

        let n = buf.len().min(self.read_buf.len());
        buf[..n].copy_from_slice(&self.read_buf[..n]);
        self.read_buf.advance(n);
        Ok(n)
    }

    fn ensure_usable(&self) -> Result<()> {
        match self.state {
            ConnState::Failed => Err(TransportError::Failed),
            ConnState::Fresh => Err(TransportError::NotEstablished),
            ConnState::Established | ConnState::Closed => Ok(()),
        }
    }

    fn fail(&mut self, err: &TransportError) {
        if err.is_fatal() {
            warn!(role = %self.role(), error = %err, "Connection failed");
            self.state = ConnState::Failed;
        }
    }

    /// Associated data for segment `counter`.
    fn associated_data(&self, counter: u64) -> Result<Vec<u8>> {
        let key = self.session_key.as_ref().ok_or(TransportError::NotEstablished)?;
        let mut aad = Vec::with_capacity(key.as_bytes().len() + 8);
        aad.extend_from_slice(key.as_bytes());
        aad.extend_from_slice(&counter.to_le_bytes());
        Ok(aad)
    }

    fn write_segment(&mut self, chunk: &[u8]) -> Result<()> {
        let counter = self.written_segments;
        let stage = Stage::WriteSegment(counter);
        let next = counter
            .checked_add(1)
            .ok_or(TransportError::CounterExhausted { direction: "write" })?;

        let aad = self.associated_data(counter)?;
        let peer_key = self.peer_key.as_ref().ok_or(TransportError::NotEstablished)?;
        let output = self
            .signcrypter
            .signcrypt(&self.own_key, peer_key, chunk, &aad)
            .map_err(|source| TransportError::Crypto { stage, source })?;

        write_frame(&mut self.stream, &encode_message(&Segment::new(output)), stage)?;
        self.written_segments = next;

        trace!(segment = counter, len = chunk.len(), "Segment written");
        Ok(())
    }

    /// Reads and authenticates one segment.
    ///
    /// Returns `Ok(false)` on clean EOF.
    fn read_segment(&mut self) -> Result<bool> {
        let counter = self.read_segments;
        let stage = Stage::ReadSegment(counter);

        let Some(frame) = read_frame(&mut self.stream, stage)? else {
            return Ok(false);
        };
        let segment: Segment =
            decode_message(&frame).map_err(|source| TransportError::Decode { stage, source })?;
        let next = counter
            .checked_add(1)
            .ok_or(TransportError::CounterExhausted { direction: "read" })?;

        let aad = self.associated_data(counter)?;
        let peer_key = self.peer_key.as_ref().ok_or(TransportError::NotEstablished)?;
        let plaintext = self
            .signcrypter
            .unsigncrypt(peer_key, &self.own_key, &aad, &segment.payload)
            .map_err(|source| TransportError::Crypto { stage, source })?
            .ok_or(TransportError::Integrity { segment: counter })?;

        self.read_buf.extend_from_slice(&plaintext);
        self.read_segments = next;

        trace!(segment = counter, len = plaintext.len(), "Segment read");
        Ok(true)
    }
}

impl<S> Conn<S> {
    // ========================================
    // Accessors
    // ========================================

    /// Returns the connection state.
    #[must_use]
    pub const fn state(&self) -> ConnState {
        self.state
    }

    /// Returns which side of the handshake this connection plays.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self.side {
            Side::Client(_) => Role::Client,
            Side::Server(_) => Role::Server,
        }
    }

    /// Returns `true` once the handshake completed and the connection has
    /// not failed.
    #[must_use]
    pub fn is_established(&self) -> bool {
        self.session_key.is_some() && self.state != ConnState::Failed
    }

    /// Returns the session key, `None` until the handshake completes.
    #[must_use]
    pub const fn session_key(&self) -> Option<&SessionKey> {
        self.session_key.as_ref()
    }

    /// Returns the peer's signcryption public key, once known.
    #[must_use]
    pub const fn peer_key(&self) -> Option<&EcPublicKey> {
        self.peer_key.as_ref()
    }

    /// Number of segments written so far.
    #[must_use]
    pub const fn written_segments(&self) -> u64 {
        self.written_segments
    }

    /// Number of segments read so far.
    #[must_use]
    pub const fn read_segments(&self) -> u64 {
        self.read_segments
    }

    /// Returns a reference to the underlying stream.
    #[must_use]
    pub const fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Returns a mutable reference to the underlying stream.
    ///
    /// Reading or writing through it corrupts the segment sequence.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Consumes the connection, returning the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> fmt::Debug for Conn<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conn")
            .field("role", &self.role())
            .field("state", &self.state)
            .field("written_segments", &self.written_segments)
            .field("read_segments", &self.read_segments)
            .finish_non_exhaustive()
    }
}

// ============================================
// std::io Integration
// ============================================

impl<S> Read for Conn<S>
where
    S: Read + Write,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv(buf).map_err(io::Error::from)
    }
}

impl<S> Write for Conn<S>
where
    S: Read + Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.send(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

// ============================================
// Tests
// ============================================
