// ============================================
// File: crates/stl-transport/src/mock.rs
// ============================================
//! # In-Memory Duplex Stream
//!
//! ## Creation Reason
//! Provides a connected pair of byte streams for testing `Conn` without
//! sockets, plus hooks to capture and re-inject bytes in transit so tests
//! can tamper with, drop, duplicate or reorder frames.
//!
//! ## Main Functionality
//! - `MemoryStream::pair`: Two connected endpoints
//! - Blocking reads (condition variable), unbounded writes
//! - `take_outgoing` / `inject_outgoing`: Man-in-the-middle helpers
//!
//! ## Usage in Tests
//! Requires the `mock` feature outside this crate's own tests.
//! ```ignore
//! use std::io::{Read, Write};
//! use stl_transport::mock::MemoryStream;
//!
//! let (mut a, mut b) = MemoryStream::pair();
//! a.write_all(b"ping").unwrap();
//!
//! let mut buf = [0u8; 4];
//! b.read_exact(&mut buf).unwrap();
//! assert_eq!(&buf, b"ping");
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is for testing only - do not use in production
//! - Dropping an endpoint closes its write direction; the peer then
//!   reads EOF once buffered bytes are drained
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

// ============================================
// Pipe
// ============================================

#[derive(Default)]
struct PipeState {
    data: VecDeque<u8>,
    closed: bool,
}

/// One direction of the duplex stream.
#[derive(Default)]
struct Pipe {
    state: Mutex<PipeState>,
    readable: Condvar,
}

impl Pipe {
    fn push(&self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        }
        state.data.extend(bytes);
        drop(state);
        self.readable.notify_all();
        Ok(())
    }

    fn close(&self) {
        self.state.lock().closed = true;
        self.readable.notify_all();
    }
}

// ============================================
// MemoryStream
// ============================================

/// One endpoint of an in-memory duplex byte stream.
pub struct MemoryStream {
    incoming: Arc<Pipe>,
    outgoing: Arc<Pipe>,
}

impl MemoryStream {
    /// Creates two connected endpoints.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Pipe::default());
        let b_to_a = Arc::new(Pipe::default());
        (
            Self {
                incoming: Arc::clone(&b_to_a),
                outgoing: Arc::clone(&a_to_b),
            },
            Self {
                incoming: a_to_b,
                outgoing: b_to_a,
            },
        )
    }

    /// Removes and returns bytes this endpoint wrote that the peer has
    /// not read yet.
    #[must_use]
    pub fn take_outgoing(&self) -> Vec<u8> {
        self.outgoing.state.lock().data.drain(..).collect()
    }

    /// Appends bytes to what the peer will read next, as if this endpoint
    /// had written them.
    ///
    /// # Errors
    /// Returns `BrokenPipe` if this endpoint's write side is closed.
    pub fn inject_outgoing(&self, bytes: &[u8]) -> io::Result<()> {
        self.outgoing.push(bytes)
    }

    /// Returns the number of bytes waiting to be read by this endpoint.
    #[must_use]
    pub fn pending_incoming(&self) -> usize {
        self.incoming.state.lock().data.len()
    }

    /// Closes the write direction; the peer reads EOF after draining.
    pub fn close_write(&self) {
        self.outgoing.close();
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut state = self.incoming.state.lock();
        while state.data.is_empty() && !state.closed {
            self.incoming.readable.wait(&mut state);
        }

        let n = buf.len().min(state.data.len());
        for (slot, byte) in buf.iter_mut().zip(state.data.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.outgoing.push(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MemoryStream {
    fn drop(&mut self) {
        self.outgoing.close();
    }
}

// ============================================
// Tests
// ============================================
