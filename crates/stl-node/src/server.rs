// ============================================
// File: crates/stl-node/src/server.rs
// ============================================
//! # Echo Server and Client
//!
//! ## Creation Reason
//! Exercises the secure transport end to end over TCP: a blocking echo
//! server that authorizes clients with the allowlist verifier, and a client
//! that sends a message and reads the echo back.
//!
//! ## Main Functionality
//! - `server_config` / `client_config`: Build transport configs from
//!   `NodeConfig` and certificate files
//! - `EchoServer`: Accept loop, one thread per connection
//! - `ShutdownHandle`: Stops the accept loop
//! - `connect` / `exchange`: Client side
//!
//! ## Server Architecture
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 EchoServer                   │
//! │                                              │
//! │  accept loop ──► thread per connection       │
//! │                    │                         │
//! │                    ▼                         │
//! │           Conn::server(handshake)            │
//! │                    │                         │
//! │                    ▼                         │
//! │           recv ──► send (until EOF)          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Socket timeouts are the only deadlines; a stalled peer costs one
//!   thread until `io_timeout_secs` passes
//! - The accept loop only notices shutdown when it wakes up;
//!   `ShutdownHandle::trigger` connects once to wake it
//!
//! ## Last Modified
//! v0.1.0 - Initial echo server

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use stl_transport::{ClientConfig, Conn, ServerConfig, Stage, TransportError, MAX_SEGMENT_SIZE};

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::keystore::{load_certificate, load_private_certificate};
use crate::verifier::AllowlistVerifier;

/// Size of the echo buffer.
const ECHO_BUFFER_SIZE: usize = MAX_SEGMENT_SIZE;

// ============================================
// Config Builders
// ============================================

/// Builds the server side transport config.
///
/// # Errors
/// Returns an error if the config lacks server settings or a certificate
/// file cannot be loaded.
pub fn server_config(config: &NodeConfig) -> Result<ServerConfig> {
    config.validate_for_server()?;

    let identity = load_private_certificate(required(
        "identity.certificate_file",
        config.identity.certificate_file.as_deref(),
    )?)?;

    let mut verifier = AllowlistVerifier::new(*identity.handshake_key());
    for path in &config.verifier.allowed_clients {
        verifier = verifier.allow_client(&load_certificate(path)?);
    }
    if config.verifier.require_tunnel {
        let tunnel_path = required(
            "tunnel.certificate_file",
            config.tunnel.certificate_file.as_deref(),
        )?;
        verifier = verifier.require_tunnel(&load_certificate(tunnel_path)?);
    }

    if verifier.is_open() {
        warn!("No allowed clients configured, accepting any client");
    } else {
        info!(clients = verifier.client_count(), "Client allowlist loaded");
    }

    Ok(ServerConfig::from_certificate(&identity, Arc::new(verifier))?)
}

/// Builds the client side transport config.
///
/// # Errors
/// Returns an error if the config lacks client settings or a certificate
/// file cannot be loaded.
pub fn client_config(config: &NodeConfig) -> Result<ClientConfig> {
    config.validate_for_client()?;

    let identity = load_private_certificate(required(
        "identity.certificate_file",
        config.identity.certificate_file.as_deref(),
    )?)?;
    let server = load_certificate(required(
        "peer.server_certificate_file",
        config.peer.server_certificate_file.as_deref(),
    )?)?;
    let tunnel = load_certificate(required(
        "tunnel.certificate_file",
        config.tunnel.certificate_file.as_deref(),
    )?)?;

    Ok(ClientConfig::from_certificates(&identity, &server, &tunnel)?)
}

fn required<'a>(field: &str, path: Option<&'a Path>) -> Result<&'a Path> {
    path.ok_or_else(|| NodeError::config_invalid(field, "missing"))
}

// ============================================
// EchoServer
// ============================================

/// Stops an `EchoServer` accept loop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ShutdownHandle {
    /// Requests shutdown and wakes the accept loop.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        // Wake the blocking accept; failure means the loop is already gone
        let _ = TcpStream::connect(wake_addr(self.addr));
    }

    /// Returns `true` once shutdown was requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Address to connect to when waking a listener bound to `addr`.
///
/// A wildcard bind is reached through the loopback of the same family.
fn wake_addr(mut addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => addr.set_ip(Ipv4Addr::LOCALHOST.into()),
        IpAddr::V6(ip) if ip.is_unspecified() => addr.set_ip(Ipv6Addr::LOCALHOST.into()),
        _ => {}
    }
    addr
}

/// Blocking TCP echo server over secure connections.
pub struct EchoServer {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    io_timeout: Duration,
    shutdown: Arc<AtomicBool>,
    connections: Arc<AtomicU64>,
}

impl EchoServer {
    /// Binds the listener.
    ///
    /// # Errors
    /// Returns `StartupFailed` if the address cannot be bound.
    pub fn bind(addr: SocketAddr, config: ServerConfig, io_timeout: Duration) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| NodeError::startup_failed(format!("bind {addr}: {e}")))?;

        Ok(Self {
            listener,
            config: Arc::new(config),
            io_timeout,
            shutdown: Arc::new(AtomicBool::new(false)),
            connections: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Returns the bound address.
    ///
    /// # Errors
    /// Returns `Io` if the socket cannot report its address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Returns a handle that stops `run`.
    ///
    /// # Errors
    /// Returns `Io` if the socket cannot report its address.
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        Ok(ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            addr: self.local_addr()?,
        })
    }

    /// Number of connections accepted so far.
    #[must_use]
    pub fn connection_count(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    /// Runs the accept loop until shutdown is triggered.
    ///
    /// Connection threads still running at shutdown are detached.
    ///
    /// # Errors
    /// Returns `Io` if the listener fails.
    pub fn run(&self) -> Result<()> {
        info!("Echo server listening on {}", self.local_addr()?);

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Accept error: {}", e);
                    continue;
                }
            };

            let id = self.connections.fetch_add(1, Ordering::Relaxed);
            let config = Arc::clone(&self.config);
            let timeout = self.io_timeout;
            thread::Builder::new()
                .name(format!("stl-conn-{id}"))
                .spawn(move || {
                    let peer = stream.peer_addr().ok();
                    match handle_connection(stream, config, timeout) {
                        Ok(bytes) => debug!(conn = id, ?peer, bytes, "Connection finished"),
                        Err(e) if e.is_suspicious() => {
                            warn!(conn = id, ?peer, error = %e, "Connection failed");
                        }
                        Err(e) => debug!(conn = id, ?peer, error = %e, "Connection dropped"),
                    }
                })?;
        }

        info!("Echo server stopped");
        Ok(())
    }
}

/// Runs one server connection: handshake, then echo until EOF.
///
/// Returns the number of bytes echoed.
fn handle_connection(
    stream: TcpStream,
    config: Arc<ServerConfig>,
    timeout: Duration,
) -> Result<u64> {
    set_timeouts(&stream, timeout)?;

    let mut conn = Conn::server(stream, config);
    conn.handshake()?;

    let mut buf = vec![0u8; ECHO_BUFFER_SIZE];
    let mut echoed = 0u64;
    loop {
        let n = conn.recv(&mut buf)?;
        if n == 0 {
            break;
        }
        conn.send(&buf[..n])?;
        echoed += n as u64;
    }

    // Best effort; the peer may already be gone
    let _ = conn.get_ref().shutdown(Shutdown::Write);
    Ok(echoed)
}

fn set_timeouts(stream: &TcpStream, timeout: Duration) -> Result<()> {
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    stream.set_nodelay(true)?;
    Ok(())
}

// ============================================
// Client
// ============================================

/// Connects and completes the handshake.
///
/// # Errors
/// Returns `Io` if the TCP connection fails, or the transport error if the
/// handshake fails.
pub fn connect(
    addr: SocketAddr,
    config: ClientConfig,
    timeout: Duration,
) -> Result<Conn<TcpStream>> {
    let stream = TcpStream::connect_timeout(&addr, timeout)
        .map_err(|e| TransportError::io(Stage::HandshakeRequest, e))?;
    set_timeouts(&stream, timeout)?;

    let mut conn = Conn::client(stream, Arc::new(config));
    conn.handshake()?;
    info!(server = %addr, "Connected");
    Ok(conn)
}

/// Sends `message` to an echo server and returns what comes back.
///
/// The message goes out one segment at a time and each segment's echo is
/// read before the next is sent, so neither side ever blocks on a full
/// socket buffer. After the last segment the write half is closed and the
/// rest of the reply is drained until EOF.
///
/// # Errors
/// Returns the transport error if any segment fails.
pub fn exchange(conn: &mut Conn<TcpStream>, message: &[u8]) -> Result<Vec<u8>> {
    let mut reply = Vec::with_capacity(message.len());
    let mut buf = vec![0u8; ECHO_BUFFER_SIZE];

    'send: for chunk in message.chunks(MAX_SEGMENT_SIZE) {
        conn.send(chunk)?;

        let mut pending = chunk.len();
        while pending > 0 {
            let n = conn.recv(&mut buf)?;
            if n == 0 {
                debug!(sent = reply.len(), "Server closed during exchange");
                break 'send;
            }
            reply.extend_from_slice(&buf[..n]);
            pending = pending.saturating_sub(n);
        }
    }

    // Best effort; the server may already have closed
    let _ = conn.get_ref().shutdown(Shutdown::Write);
    loop {
        let n = conn.recv(&mut buf)?;
        if n == 0 {
            break;
        }
        reply.extend_from_slice(&buf[..n]);
    }

    debug!(
        sent = message.len(),
        received = reply.len(),
        segments = conn.read_segments(),
        "Exchange complete"
    );
    Ok(reply)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use rand::rngs::OsRng;
    use stl_core::{Certificate, Curve};

    use super::*;
    use crate::keystore::save_certificate;

    struct Files {
        dir: PathBuf,
    }

    impl Files {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("stl-node-{}-{name}", std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            Self { dir }
        }

        fn write(&self, name: &str, cert: &Certificate) -> PathBuf {
            let path = self.dir.join(name);
            save_certificate(cert, &path).unwrap();
            path
        }
    }

    impl Drop for Files {
        fn drop(&mut self) {
            std::fs::remove_dir_all(&self.dir).ok();
        }
    }

    fn cert(id: &str) -> Certificate {
        Certificate::generate(Curve::P256, &mut OsRng).unwrap().with_id(id)
    }

    fn configs(files: &Files, allow_client: bool) -> (NodeConfig, NodeConfig) {
        let (client, server, tunnel) = (cert("alice"), cert("server"), cert("tunnel"));

        let mut server_cfg = NodeConfig::default();
        server_cfg.network.listen_addr = "127.0.0.1:0".parse().unwrap();
        server_cfg.identity.certificate_file = Some(files.write("server.json", &server));
        server_cfg.tunnel.certificate_file = Some(files.write("tunnel.pub.json", &tunnel.public_only()));
        server_cfg.verifier.require_tunnel = true;
        let allowed = if allow_client { client.public_only() } else { cert("bob").public_only() };
        server_cfg.verifier.allowed_clients = vec![files.write("allowed.pub.json", &allowed)];

        let mut client_cfg = NodeConfig::default();
        client_cfg.identity.certificate_file = Some(files.write("alice.json", &client));
        client_cfg.peer.server_certificate_file =
            Some(files.write("server.pub.json", &server.public_only()));
        client_cfg.tunnel.certificate_file = server_cfg.tunnel.certificate_file.clone();

        (server_cfg, client_cfg)
    }

    fn start(server_cfg: &NodeConfig) -> (SocketAddr, ShutdownHandle, thread::JoinHandle<Result<()>>) {
        let server = EchoServer::bind(
            server_cfg.network.listen_addr,
            server_config(server_cfg).unwrap(),
            server_cfg.io_timeout(),
        )
        .unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.shutdown_handle().unwrap();
        (addr, handle, thread::spawn(move || server.run()))
    }

    #[test]
    fn test_echo_roundtrip() {
        let files = Files::new("echo");
        let (server_cfg, client_cfg) = configs(&files, true);
        let (addr, shutdown, join) = start(&server_cfg);

        let mut conn = connect(addr, client_config(&client_cfg).unwrap(), client_cfg.io_timeout()).unwrap();
        let message = vec![0x5Au8; 40_000];
        let reply = exchange(&mut conn, &message).unwrap();
        assert_eq!(reply, message);

        shutdown.trigger();
        join.join().unwrap().unwrap();
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_echo_multi_megabyte_message() {
        let files = Files::new("large");
        let (server_cfg, client_cfg) = configs(&files, true);
        let (addr, shutdown, join) = start(&server_cfg);

        let mut conn = connect(addr, client_config(&client_cfg).unwrap(), Duration::from_secs(10)).unwrap();
        let message: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        let reply = exchange(&mut conn, &message).unwrap();
        assert_eq!(reply.len(), message.len());
        assert!(reply == message);
        assert_eq!(conn.written_segments(), 192);

        shutdown.trigger();
        join.join().unwrap().unwrap();
    }

    #[test]
    fn test_empty_exchange() {
        let files = Files::new("empty");
        let (server_cfg, client_cfg) = configs(&files, true);
        let (addr, shutdown, join) = start(&server_cfg);

        let mut conn = connect(addr, client_config(&client_cfg).unwrap(), client_cfg.io_timeout()).unwrap();
        assert!(exchange(&mut conn, b"").unwrap().is_empty());
        assert_eq!(conn.written_segments(), 0);

        shutdown.trigger();
        join.join().unwrap().unwrap();
    }

    #[test]
    fn test_shutdown_wildcard_listener() {
        let files = Files::new("wildcard");
        let (mut server_cfg, _) = configs(&files, true);
        server_cfg.network.listen_addr = "0.0.0.0:0".parse().unwrap();
        let (_, shutdown, join) = start(&server_cfg);

        shutdown.trigger();
        join.join().unwrap().unwrap();
    }

    #[test]
    fn test_wake_addr_uses_loopback_for_wildcards() {
        let v4: SocketAddr = "0.0.0.0:7400".parse().unwrap();
        assert_eq!(wake_addr(v4), "127.0.0.1:7400".parse().unwrap());

        let v6: SocketAddr = "[::]:7400".parse().unwrap();
        assert_eq!(wake_addr(v6), "[::1]:7400".parse().unwrap());

        let bound: SocketAddr = "10.1.2.3:7400".parse().unwrap();
        assert_eq!(wake_addr(bound), bound);
    }

    #[test]
    fn test_unlisted_client_rejected() {
        let files = Files::new("reject");
        let (server_cfg, client_cfg) = configs(&files, false);
        let (addr, shutdown, join) = start(&server_cfg);

        let result = connect(addr, client_config(&client_cfg).unwrap(), client_cfg.io_timeout());
        assert!(matches!(
            result,
            Err(NodeError::Transport(TransportError::Handshake { .. }))
        ));

        shutdown.trigger();
        join.join().unwrap().unwrap();
    }

    #[test]
    fn test_server_config_requires_identity() {
        let config = NodeConfig::default();
        assert!(matches!(server_config(&config), Err(NodeError::ConfigInvalid { .. })));
    }
}
