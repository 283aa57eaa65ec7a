//! Layer 1: physical.
//!
//! Frames the byte sequence for stream transmission. This layer adds no
//! metadata about the message; it only delimits where one frame starts and
//! ends on an otherwise unstructured byte stream.
//!
//! # Frame Format
//!
//! ```text
//! +-----------------+
//! | preamble (1)    |  0xAA (10101010)
//! +-----------------+
//! | frame_len (4)   |  u32 little-endian, length of the inner frame
//! +-----------------+
//! | inner frame     |  frame_len bytes
//! +-----------------+
//! ```
//!
//! Decapsulation must locate exactly one complete frame: too few bytes is
//! truncation, a wrong preamble or trailing bytes after the declared length
//! is a structure violation.

use crate::context::PipelineContext;
use crate::error::{Error, Result};
use crate::layer::{Layer, LayerName};

/// Alternating-bit preamble marking the start of a frame.
pub const PREAMBLE: u8 = 0xAA;

/// Bytes before the inner frame: preamble plus length word.
pub const PROLOGUE_SIZE: usize = 1 + 4;

/// Parse a frame prologue, returning the declared inner-frame length.
///
/// Shared with stream-reading delivery ports, which need to know how many
/// bytes to pull off the wire before a whole frame is in hand.
pub fn parse_prologue(prologue: &[u8; PROLOGUE_SIZE]) -> Result<usize> {
    if prologue[0] != PREAMBLE {
        return Err(Error::MalformedPayload {
            layer: LayerName::Physical,
            detail: format!("bad preamble {:#04x}, expected {PREAMBLE:#04x}", prologue[0]),
        });
    }
    // The tail of a fixed-size array; the slice is exactly 4 bytes.
    Ok(u32::from_le_bytes(prologue[1..].try_into().unwrap()) as usize)
}

/// The physical layer. Stateless framing only.
#[derive(Debug, Default)]
pub struct PhysicalLayer;

impl Layer for PhysicalLayer {
    fn name(&self) -> LayerName {
        LayerName::Physical
    }

    fn encapsulate(&self, payload: &[u8], _ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        let mut frame = Vec::with_capacity(PROLOGUE_SIZE + payload.len());
        frame.push(PREAMBLE);
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(payload);
        Ok(frame)
    }

    fn decapsulate(&self, envelope: &[u8], _ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        if envelope.len() < PROLOGUE_SIZE {
            return Err(Error::TruncatedFrame {
                layer: LayerName::Physical,
                required: PROLOGUE_SIZE,
                actual: envelope.len(),
            });
        }

        // Bounds checked above.
        let prologue: &[u8; PROLOGUE_SIZE] = envelope[..PROLOGUE_SIZE].try_into().unwrap();
        let frame_len = parse_prologue(prologue)?;

        let body = &envelope[PROLOGUE_SIZE..];
        if body.len() < frame_len {
            return Err(Error::TruncatedFrame {
                layer: LayerName::Physical,
                required: PROLOGUE_SIZE + frame_len,
                actual: envelope.len(),
            });
        }
        if body.len() > frame_len {
            return Err(Error::MalformedPayload {
                layer: LayerName::Physical,
                detail: format!(
                    "{} trailing bytes after a complete {frame_len}-byte frame",
                    body.len() - frame_len
                ),
            });
        }

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionId;

    fn ctx() -> PipelineContext {
        PipelineContext::for_receive(SessionId::from("s"), 1)
    }

    #[test]
    fn test_round_trip() {
        let layer = PhysicalLayer;
        let payload = b"inner frame bytes";

        let frame = layer.encapsulate(payload, &mut ctx()).unwrap();
        assert_eq!(frame[0], PREAMBLE);

        let restored = layer.decapsulate(&frame, &mut ctx()).unwrap();
        assert_eq!(restored, payload);
    }

    #[test]
    fn test_empty_payload() {
        let layer = PhysicalLayer;
        let frame = layer.encapsulate(b"", &mut ctx()).unwrap();
        assert_eq!(frame.len(), PROLOGUE_SIZE);
        let restored = layer.decapsulate(&frame, &mut ctx()).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_bad_preamble() {
        let layer = PhysicalLayer;
        let mut frame = layer.encapsulate(b"payload", &mut ctx()).unwrap();
        frame[0] = 0x55;

        let result = layer.decapsulate(&frame, &mut ctx());
        assert!(matches!(result, Err(Error::MalformedPayload { .. })));
    }

    #[test]
    fn test_truncated_frame() {
        let layer = PhysicalLayer;
        let mut frame = layer.encapsulate(b"payload", &mut ctx()).unwrap();
        frame.truncate(frame.len() - 3);

        let result = layer.decapsulate(&frame, &mut ctx());
        assert!(matches!(result, Err(Error::TruncatedFrame { .. })));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let layer = PhysicalLayer;
        let mut frame = layer.encapsulate(b"payload", &mut ctx()).unwrap();
        frame.push(0x00);

        let result = layer.decapsulate(&frame, &mut ctx());
        assert!(matches!(result, Err(Error::MalformedPayload { .. })));
    }

    #[test]
    fn test_prologue_parse() {
        let mut prologue = [0u8; PROLOGUE_SIZE];
        prologue[0] = PREAMBLE;
        prologue[1..].copy_from_slice(&300u32.to_le_bytes());
        assert_eq!(parse_prologue(&prologue).unwrap(), 300);
    }
}
