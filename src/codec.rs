// Trace Native Host - Wire Codec
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Native messaging framing: <u32 little-endian length><UTF-8 JSON payload>,
// identical in both directions. Reads loop until the full prefix and payload
// have arrived; writes go out with write_all and an immediate flush.

use crate::message::{TraceMessage, TraceStatus, WireMessage};
use std::io::{self, Read, Write};

// ============================================================================
// CONSTANTS
// ============================================================================

const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest frame the browser will send to a host (64 MiB)
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("stream error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended part-way through a frame
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("frame of {len} bytes exceeds limit of {max}")]
    TooLarge { len: usize, max: usize },

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl FrameError {
    /// Truncation leaves the stream at end-of-input, so the session can skip
    /// the frame and let the next read end cleanly. Everything else is fatal.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::Truncated { .. })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("malformed message payload: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

// ============================================================================
// FRAMING
// ============================================================================

/// Fill `buf` from `reader`, retrying short and interrupted reads.
/// Returns the number of bytes read, less than `buf.len()` only at end-of-stream.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read one frame. `Ok(None)` means the peer closed the stream before a new
/// frame started.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    let got = read_full(reader, &mut prefix)?;
    if got == 0 {
        return Ok(None);
    }
    if got < LENGTH_PREFIX_SIZE {
        return Err(FrameError::Truncated { expected: LENGTH_PREFIX_SIZE, actual: got });
    }

    let len = u32::from_le_bytes(prefix) as usize;
    if len > MAX_INBOUND_FRAME {
        return Err(FrameError::TooLarge { len, max: MAX_INBOUND_FRAME });
    }

    let mut payload = vec![0u8; len];
    let got = read_full(reader, &mut payload)?;
    if got < len {
        return Err(FrameError::Truncated { expected: len, actual: got });
    }
    Ok(Some(payload))
}

/// Write one frame and flush so the peer sees it immediately.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
        len: payload.len(),
        max: u32::MAX as usize,
    })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

// ============================================================================
// PAYLOADS
// ============================================================================

/// Parse an inbound payload. Unknown level values never fail the parse.
pub fn decode(payload: &[u8]) -> Result<TraceMessage, DecodeError> {
    let wire: WireMessage = serde_json::from_slice(payload)?;
    Ok(wire.into_message())
}

/// Compact `{"Status":"..."}` body
pub fn encode(status: &TraceStatus) -> Result<Vec<u8>, FrameError> {
    Ok(serde_json::to_vec(status)?)
}

/// Payload for a message in the inbound wire shape, as the extension sends it
pub fn encode_message(message: &TraceMessage) -> Result<Vec<u8>, FrameError> {
    Ok(serde_json::to_vec(&WireMessage::from_message(message))?)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::TraceLevel;
    use crate::message::{Command, Status};
    use std::io::Cursor;

    /// Reader that hands out at most `chunk` bytes per call
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn frames_round_trip_at_boundary_sizes() {
        for size in [0usize, 1, 4095, 65536] {
            let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let mut wire = Vec::new();
            write_frame(&mut wire, &payload).unwrap();
            assert_eq!(wire.len(), size + 4);
            assert_eq!(&wire[..4], &(size as u32).to_le_bytes());

            let mut cursor = Cursor::new(wire);
            let read = read_frame(&mut cursor).unwrap().expect("frame");
            assert_eq!(read, payload, "size {}", size);
            assert!(read_frame(&mut cursor).unwrap().is_none());
        }
    }

    #[test]
    fn empty_stream_is_end_of_stream() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(read_frame(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn partial_reads_are_reassembled() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"{\"Command\":\"exit\"}").unwrap();
        let mut reader = Trickle { data: &wire, chunk: 3 };
        let payload = read_frame(&mut reader).unwrap().unwrap();
        assert_eq!(payload, b"{\"Command\":\"exit\"}");
    }

    #[test]
    fn short_prefix_is_truncated() {
        let mut cursor = Cursor::new(vec![5u8, 0]);
        match read_frame(&mut cursor) {
            Err(FrameError::Truncated { expected: 4, actual: 2 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn short_payload_is_truncated() {
        let mut wire = 10u32.to_le_bytes().to_vec();
        wire.extend_from_slice(b"abc");
        let err = read_frame(&mut Cursor::new(wire)).unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(err, FrameError::Truncated { expected: 10, actual: 3 }));
    }

    #[test]
    fn oversized_length_is_rejected() {
        let wire = u32::MAX.to_le_bytes().to_vec();
        let err = read_frame(&mut Cursor::new(wire)).unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn decode_full_message() {
        let msg = decode(
            br#"{"Command":"trace","Message":"hi","Source":"S","Context":"C","Level":"debug"}"#,
        )
        .unwrap();
        assert_eq!(msg.command, Command::Trace);
        assert_eq!(msg.message.as_deref(), Some("hi"));
        assert_eq!(msg.source.as_deref(), Some("S"));
        assert_eq!(msg.context.as_deref(), Some("C"));
        assert_eq!(msg.level, Some(TraceLevel::Debug));
    }

    #[test]
    fn decode_unknown_level_falls_back() {
        let msg = decode(br#"{"Command":"trace","Message":"x","Level":"shouting"}"#).unwrap();
        assert_eq!(msg.level, Some(TraceLevel::Warning));
    }

    #[test]
    fn decode_numeric_level_string() {
        let msg = decode(br#"{"Command":"trace","Message":"x","Level":"2"}"#).unwrap();
        assert_eq!(msg.level, Some(TraceLevel::Info));
    }

    #[test]
    fn decode_ignores_extra_fields() {
        let msg = decode(br#"{"Command":"exit","Extra":[1,2,3]}"#).unwrap();
        assert_eq!(msg.command, Command::Exit);
    }

    #[test]
    fn decode_rejects_malformed_payloads() {
        assert!(decode(b"{not json").is_err());
        assert!(decode(b"[1,2]").is_err());
        assert!(decode(b"null").is_err());
        assert!(decode(br#"{"Command":7}"#).is_err());
        assert!(decode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn message_payload_round_trips() {
        let original = TraceMessage::trace("Hello world!")
            .with_source("system-diagnostics-trace")
            .with_context("service-worker")
            .with_level(TraceLevel::ExtremelyVerbose);
        let decoded = decode(&encode_message(&original).unwrap()).unwrap();
        assert_eq!(decoded, original);

        let bare = TraceMessage::exit();
        assert_eq!(decode(&encode_message(&bare).unwrap()).unwrap(), bare);
    }

    #[test]
    fn encode_failure_is_fatal() {
        let err = FrameError::from(serde_json::from_str::<u8>("x").unwrap_err());
        assert!(matches!(err, FrameError::Encode(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn encode_status_is_compact() {
        assert_eq!(encode(&Status::Processed.into()).unwrap(), br#"{"Status":"processed"}"#.to_vec());
        assert_eq!(encode(&Status::Exit.into()).unwrap(), br#"{"Status":"exit"}"#.to_vec());
    }
}
