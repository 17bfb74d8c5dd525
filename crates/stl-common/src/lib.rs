// ============================================
// File: crates/stl-common/src/lib.rs
// ============================================
//! # STL Common - Shared Utilities Library
//!
//! ## Creation Reason
//! Provides foundational types shared by every STL crate so that identity
//! handling and error reporting stay consistent across layers.
//!
//! ## Main Functionality
//! - [`types`]: `PeerId` identity bytes (certificates, handshakes, verifiers)
//! - [`error`]: Common error types and result aliases
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   stl-node                          │
//! │                      │                              │
//! │                      ▼                              │
//! │                stl-transport                        │
//! │                      │                              │
//! │                      ▼                              │
//! │                  stl-core                           │
//! │                      │                              │
//! │                      ▼                              │
//! │                 stl-common  ◄── You are here        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - Keep dependencies minimal
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use types::PeerId;
