// ============================================
// File: crates/stl-transport/src/lib.rs
// ============================================
//! # STL Transport - Secure Stream Layer
//!
//! ## Creation Reason
//! Turns an ordered, reliable byte stream (typically a TCP socket) into an
//! authenticated, confidential stream by running the STL handshake and
//! signcrypting application data segment by segment.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`conn`]: `Conn`, the secure stream
//! - [`config`]: `ClientConfig` / `ServerConfig`
//! - [`framing`]: u64 length-prefixed frames
//! - [`error`]: Transport-specific error types
//! - `mock`: In-memory duplex stream (`mock` feature)
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   stl-node                          │
//! │                      │                              │
//! │                      ▼                              │
//! │                stl-transport  ◄── You are here      │
//! │                      │                              │
//! │                      ▼                              │
//! │                  stl-core                           │
//! │                      │                              │
//! │                      ▼                              │
//! │                 stl-common                          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! application ──send──► Conn ──segments──► framing ──► byte stream
//! application ◄─recv─── Conn ◄─segments─── framing ◄── byte stream
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `Conn` is blocking and single-owner; wrap it yourself for sharing
//! - The byte stream must preserve order and not lose bytes
//! - Mock implementations available with `mock` feature
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod conn;
pub mod error;
pub mod framing;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export primary types
pub use config::{ClientConfig, ServerConfig};
pub use conn::{Conn, ConnState, Role, MAX_SEGMENT_SIZE};
pub use error::{Result, Stage, TransportError};
pub use framing::{read_frame, write_frame, MAX_FRAME_SIZE};
