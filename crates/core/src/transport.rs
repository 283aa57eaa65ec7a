//! Layer 4: transport.
//!
//! Stamps a per-connection sequence number and a CRC-32 over the segment.
//! Decapsulation recomputes the checksum first (a corrupted segment's
//! sequence field means nothing), then enforces strict in-order delivery:
//! the carried sequence must be exactly the next expected value. There is
//! no reordering tolerance and no retransmission.
//!
//! # Header Format
//!
//! ```text
//! +-----------------+
//! | sequence (8)    |  u64 little-endian, starts at 1, +1 per message
//! +-----------------+
//! | checksum (4)    |  u32 CRC-32 over sequence bytes + payload
//! +-----------------+
//! | payload         |
//! +-----------------+
//! ```

use crate::codec;
use crate::context::PipelineContext;
use crate::error::{Error, Result};
use crate::layer::{Layer, LayerName};

/// First sequence number a connection assigns and expects.
pub const INITIAL_SEQUENCE: u64 = 1;

/// Header size: sequence word plus checksum word.
const HEADER_SIZE: usize = 8 + 4;

/// The transport layer. The sequence counter lives on the controller and
/// arrives through the context, so the layer itself stays stateless.
#[derive(Debug, Default)]
pub struct TransportLayer;

fn segment_checksum(sequence: u64, payload: &[u8]) -> u32 {
    let mut covered = Vec::with_capacity(8 + payload.len());
    covered.extend_from_slice(&sequence.to_le_bytes());
    covered.extend_from_slice(payload);
    codec::checksum(&covered)
}

impl Layer for TransportLayer {
    fn name(&self) -> LayerName {
        LayerName::Transport
    }

    fn encapsulate(&self, payload: &[u8], ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        let sequence = ctx.sequence();
        let checksum = segment_checksum(sequence, payload);

        let mut envelope = Vec::with_capacity(HEADER_SIZE + payload.len());
        envelope.extend_from_slice(&sequence.to_le_bytes());
        envelope.extend_from_slice(&checksum.to_le_bytes());
        envelope.extend_from_slice(payload);
        Ok(envelope)
    }

    fn decapsulate(&self, envelope: &[u8], ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        if envelope.len() < HEADER_SIZE {
            return Err(Error::TruncatedFrame {
                layer: LayerName::Transport,
                required: HEADER_SIZE,
                actual: envelope.len(),
            });
        }

        // Bounds checked above; both slices have exact sizes.
        let sequence = u64::from_le_bytes(envelope[0..8].try_into().unwrap());
        let carried = u32::from_le_bytes(envelope[8..12].try_into().unwrap());
        let payload = &envelope[HEADER_SIZE..];

        let computed = segment_checksum(sequence, payload);
        if computed != carried {
            return Err(Error::ChecksumMismatch {
                layer: LayerName::Transport,
                expected: carried,
                actual: computed,
            });
        }

        let expected = ctx.sequence();
        if sequence != expected {
            return Err(Error::SequenceViolation {
                expected,
                actual: sequence,
            });
        }

        Ok(payload.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionId;

    fn ctx_at(sequence: u64) -> PipelineContext {
        PipelineContext::for_receive(SessionId::from("s"), sequence)
    }

    #[test]
    fn test_round_trip() {
        let layer = TransportLayer;
        let payload = b"segment payload";

        let envelope = layer.encapsulate(payload, &mut ctx_at(1)).unwrap();
        let restored = layer.decapsulate(&envelope, &mut ctx_at(1)).unwrap();
        assert_eq!(restored, payload);
    }

    #[test]
    fn test_checksum_mismatch_on_payload_corruption() {
        let layer = TransportLayer;
        let mut envelope = layer.encapsulate(b"payload", &mut ctx_at(1)).unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0x01;

        let result = layer.decapsulate(&envelope, &mut ctx_at(1));
        assert!(matches!(
            result,
            Err(Error::ChecksumMismatch {
                layer: LayerName::Transport,
                ..
            })
        ));
    }

    #[test]
    fn test_checksum_mismatch_on_sequence_corruption() {
        // Corrupting the sequence field must surface as corruption, not as
        // a sequence violation: the checksum covers the sequence bytes.
        let layer = TransportLayer;
        let mut envelope = layer.encapsulate(b"payload", &mut ctx_at(1)).unwrap();
        envelope[0] ^= 0xFF;

        let result = layer.decapsulate(&envelope, &mut ctx_at(1));
        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_duplicate_sequence_rejected() {
        let layer = TransportLayer;
        let envelope = layer.encapsulate(b"payload", &mut ctx_at(3)).unwrap();

        // First delivery at expected 3 succeeds, re-delivery at expected 4
        // is a duplicate.
        layer.decapsulate(&envelope, &mut ctx_at(3)).unwrap();
        let result = layer.decapsulate(&envelope, &mut ctx_at(4));
        assert!(matches!(
            result,
            Err(Error::SequenceViolation {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_skipped_sequence_rejected() {
        let layer = TransportLayer;
        let envelope = layer.encapsulate(b"payload", &mut ctx_at(5)).unwrap();

        let result = layer.decapsulate(&envelope, &mut ctx_at(4));
        assert!(matches!(
            result,
            Err(Error::SequenceViolation {
                expected: 4,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let layer = TransportLayer;
        let result = layer.decapsulate(&[0u8; 11], &mut ctx_at(1));
        assert!(matches!(result, Err(Error::TruncatedFrame { .. })));
    }
}
