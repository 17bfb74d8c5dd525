// ============================================
// File: crates/stl-transport/src/framing.rs
// ============================================
//! # Length-Prefixed Framing
//!
//! ## Creation Reason
//! Handshake messages and segments travel over an ordered byte stream
//! with no message boundaries. Each one is wrapped in a frame.
//!
//! ## Frame Format
//! ```text
//! ┌──────────────────────────┬──────────────────────────┐
//! │ length (8 bytes, u64 LE) │ payload (length bytes)   │
//! └──────────────────────────┴──────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The declared length is checked against `MAX_FRAME_SIZE` BEFORE any
//!   allocation
//! - EOF before the first header byte is a clean close (`Ok(None)`);
//!   EOF anywhere else is `UnexpectedEof`
//!
//! ## Last Modified
//! v0.1.0 - Initial framing implementation

use std::io::{self, Read, Write};

use crate::error::{Result, Stage, TransportError};

/// Size of the frame length prefix.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Largest accepted frame payload (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1 << 20;

/// Writes one frame.
///
/// # Errors
/// - `FrameTooLarge`: payload exceeds `MAX_FRAME_SIZE`
/// - `Io`: the stream failed
pub fn write_frame<W>(writer: &mut W, payload: &[u8], stage: Stage) -> Result<()>
where
    W: Write + ?Sized,
{
    if payload.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            stage,
            size: payload.len() as u64,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    frame.extend_from_slice(payload);

    writer
        .write_all(&frame)
        .map_err(|source| TransportError::io(stage, source))
}

/// Reads one frame.
///
/// # Returns
/// - `Ok(Some(payload))`: a complete frame
/// - `Ok(None)`: the stream ended cleanly at a frame boundary
///
/// # Errors
/// - `FrameTooLarge`: declared length exceeds `MAX_FRAME_SIZE`
/// - `Io`: the stream failed or ended mid-frame
pub fn read_frame<R>(reader: &mut R, stage: Stage) -> Result<Option<Vec<u8>>>
where
    R: Read + ?Sized,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];
    let mut filled = 0;
    while filled < FRAME_HEADER_SIZE {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(TransportError::io(
                    stage,
                    io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended inside frame header"),
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(TransportError::io(stage, e)),
        }
    }

    let declared = u64::from_le_bytes(header);
    let len = match usize::try_from(declared) {
        Ok(len) if len <= MAX_FRAME_SIZE => len,
        _ => {
            return Err(TransportError::FrameTooLarge {
                stage,
                size: declared,
                max: MAX_FRAME_SIZE,
            })
        }
    };

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .map_err(|source| TransportError::io(stage, source))?;

    Ok(Some(payload))
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const STAGE: Stage = Stage::ReadSegment(0);

    #[test]
    fn test_frame_layout() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"abc", STAGE).unwrap();
        assert_eq!(&wire[..8], &3u64.to_le_bytes());
        assert_eq!(&wire[8..], b"abc");
    }

    #[test]
    fn test_read_frames_then_clean_eof() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"first", STAGE).unwrap();
        write_frame(&mut wire, b"", STAGE).unwrap();

        let mut cursor = Cursor::new(wire);
        assert_eq!(read_frame(&mut cursor, STAGE).unwrap().as_deref(), Some(&b"first"[..]));
        assert_eq!(read_frame(&mut cursor, STAGE).unwrap(), Some(Vec::new()));
        assert_eq!(read_frame(&mut cursor, STAGE).unwrap(), None);
    }

    #[test]
    fn test_eof_inside_header() {
        let mut cursor = Cursor::new(vec![0x05, 0x00, 0x00]);
        let err = read_frame(&mut cursor, STAGE).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Io { ref source, .. } if source.kind() == io::ErrorKind::UnexpectedEof
        ));
    }

    #[test]
    fn test_eof_inside_payload() {
        let mut wire = 10u64.to_le_bytes().to_vec();
        wire.extend_from_slice(b"short");
        let err = read_frame(&mut Cursor::new(wire), STAGE).unwrap_err();
        assert!(matches!(err, TransportError::Io { .. }));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let wire = u64::MAX.to_le_bytes().to_vec();
        let err = read_frame(&mut Cursor::new(wire), STAGE).unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge { size: u64::MAX, .. }));

        let mut sink = Vec::new();
        let err = write_frame(&mut sink, &vec![0u8; MAX_FRAME_SIZE + 1], STAGE).unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge { .. }));
        assert!(sink.is_empty());
    }
}
