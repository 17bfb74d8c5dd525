// ============================================
// File: crates/stl-node/src/main.rs
// ============================================
//! # STL Node Entry Point
//!
//! ## Creation Reason
//! Main entry point for the STL node binary.
//! Handles CLI parsing, logging setup, and dispatch to the node library.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Certificate generation and export
//! - Echo server and client
//!
//! ## Usage
//! ```bash
//! # Create identities
//! stl-node keygen --id server --out server.json
//! stl-node keygen --id alice --out alice.json
//! stl-node keygen --id tunnel --out tunnel.json
//!
//! # Share public parts
//! stl-node export --cert server.json --out server.pub.json
//!
//! # Run
//! stl-node serve --config server.toml
//! stl-node connect --config client.toml --message "hello"
//! stl-node validate --config server.toml
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `RUST_LOG` overrides `logging.level`
//! - Exit code is 1 on any error
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stl_core::{Certificate, Curve};
use stl_node::keystore::{load_certificate, save_certificate};
use stl_node::{client_config, connect, exchange, server_config, EchoServer, NodeConfig};

// ============================================
// CLI Definition
// ============================================

/// STL secure transport node
#[derive(Parser, Debug)]
#[command(name = "stl-node")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a certificate with fresh keys
    Keygen {
        /// Identity to assign
        #[arg(long)]
        id: String,

        /// Output file (contains private keys)
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Write the public part of a certificate
    Export {
        /// Certificate file to read
        #[arg(long)]
        cert: PathBuf,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Run the echo server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/stl/node.toml")]
        config: PathBuf,
    },

    /// Send a message to a server and print the echo
    Connect {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/stl/node.toml")]
        config: PathBuf,

        /// Message to send
        #[arg(short, long)]
        message: String,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/stl/node.toml")]
        config: PathBuf,
    },
}

// ============================================
// Main
// ============================================

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Execute command (each command initializes logging)
    let result = match cli.command {
        Commands::Keygen { id, out } => cmd_keygen(&id, &out),
        Commands::Export { cert, out } => cmd_export(&cert, &out),
        Commands::Serve { config } => cmd_serve(&config),
        Commands::Connect { config, message } => cmd_connect(&config, &message),
        Commands::Validate { config } => cmd_validate(&config),
    };

    // Handle errors
    if let Err(e) = result {
        init_logging("error");
        error!("{:#}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Generates a certificate.
fn cmd_keygen(id: &str, out: &Path) -> anyhow::Result<()> {
    init_logging("info");
    if out.exists() {
        anyhow::bail!("refusing to overwrite {}", out.display());
    }

    let cert = Certificate::generate(Curve::P256, &mut OsRng)
        .context("key generation failed")?
        .with_id(id);
    cert.validate()?;
    save_certificate(&cert, out)?;

    println!("✅ Certificate written to {}", out.display());
    println!("   Id:              {}", id);
    println!("   Handshake key:   {}", fingerprint(&cert.handshake_key().to_uncompressed()));
    println!("   Encryption key:  {}", fingerprint(&cert.encryption_key().to_uncompressed()));
    Ok(())
}

/// Exports the public part of a certificate.
fn cmd_export(cert_path: &Path, out: &Path) -> anyhow::Result<()> {
    init_logging("info");
    let cert = load_certificate(cert_path)?;
    save_certificate(&cert.public_only(), out)?;

    println!("✅ Public certificate written to {}", out.display());
    Ok(())
}

/// Runs the echo server.
fn cmd_serve(config_path: &Path) -> anyhow::Result<()> {
    let config = NodeConfig::load(config_path)?;
    init_logging(&config.logging.level);

    info!("Starting STL node v{}", env!("CARGO_PKG_VERSION"));
    let transport = server_config(&config)?;
    let server = EchoServer::bind(config.network.listen_addr, transport, config.io_timeout())?;
    server.run()?;
    Ok(())
}

/// Connects, sends one message and prints the reply.
fn cmd_connect(config_path: &Path, message: &str) -> anyhow::Result<()> {
    let config = NodeConfig::load(config_path)?;
    init_logging(&config.logging.level);

    let transport = client_config(&config)?;
    let mut conn = connect(config.network.connect_addr, transport, config.io_timeout())
        .with_context(|| format!("connecting to {}", config.network.connect_addr))?;
    let reply = exchange(&mut conn, message.as_bytes())?;

    println!("{}", String::from_utf8_lossy(&reply));
    Ok(())
}

/// Validates configuration file and the certificates it names.
fn cmd_validate(config_path: &Path) -> anyhow::Result<()> {
    init_logging("info");
    let config = NodeConfig::load(config_path)?;

    println!("✅ Configuration is valid");
    println!();
    println!("Network:");
    println!("   Listen:     {}", config.network.listen_addr);
    println!("   Connect:    {}", config.network.connect_addr);
    println!("   Timeout:    {}s", config.network.io_timeout_secs);
    println!();

    let server_ready = config.validate_for_server().is_ok() && server_config(&config).is_ok();
    let client_ready = config.validate_for_client().is_ok() && client_config(&config).is_ok();
    println!("Roles:");
    println!("   Server:     {}", if server_ready { "✅ ready" } else { "❌ not configured" });
    println!("   Client:     {}", if client_ready { "✅ ready" } else { "❌ not configured" });
    println!();
    println!("Verifier:");
    println!("   Allowed clients:  {}", config.verifier.allowed_clients.len());
    println!("   Require tunnel:   {}", config.verifier.require_tunnel);
    println!();

    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}

/// Short hex fingerprint of a public key (X coordinate prefix).
fn fingerprint(point: &[u8]) -> String {
    hex::encode(point.get(1..9).unwrap_or(point))
}
