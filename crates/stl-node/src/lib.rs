// ============================================
// File: crates/stl-node/src/lib.rs
// ============================================
//! # STL Node Library
//!
//! ## Creation Reason
//! Wraps the secure transport in something an operator can run: certificate
//! files, a TOML config, an allowlist verifier and a TCP echo server/client.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: Node configuration management
//! - [`keystore`]: JSON certificate files
//! - [`verifier`]: Allowlist `SessionVerifier`
//! - [`server`]: Echo server, client connect/exchange
//! - [`error`]: Node-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    stl-node                         │
//! │                                                     │
//! │  ┌──────────┐   ┌───────────┐   ┌──────────────┐   │
//! │  │  Config  │──►│ Keystore  │──►│   Verifier   │   │
//! │  └──────────┘   └───────────┘   └──────┬───────┘   │
//! │                                        ▼           │
//! │                               ┌──────────────┐     │
//! │                               │ Echo Server  │     │
//! │                               └──────┬───────┘     │
//! ├──────────────────────────────────────┼─────────────┤
//! │                stl-transport (Conn)  ▼             │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Everything is blocking; one OS thread per connection
//! - Configuration changes require restart (no hot-reload)
//!
//! ## Last Modified
//! v0.1.0 - Initial node library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod keystore;
pub mod server;
pub mod verifier;

// Re-export primary types
pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use server::{client_config, connect, exchange, server_config, EchoServer, ShutdownHandle};
pub use verifier::AllowlistVerifier;
