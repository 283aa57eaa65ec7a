//! Layer 2: data-link.
//!
//! Stamps MAC-like address markers and protects the entire frame with a
//! trailing frame check sequence (FCS). The FCS is the stack's outermost
//! integrity barrier: any bit flipped in transit inside the frame body is
//! caught here before the layers above ever see the bytes.
//!
//! # Frame Format
//!
//! ```text
//! +-----------------+
//! | src_mac (6)     |  MAC-like marker
//! +-----------------+
//! | dst_mac (6)     |  MAC-like marker
//! +-----------------+
//! | payload         |
//! +-----------------+
//! | fcs (4)         |  u32 CRC-32 over everything above, trails the frame
//! +-----------------+
//! ```

use crate::codec;
use crate::context::PipelineContext;
use crate::error::{Error, Result};
use crate::layer::{Layer, LayerName};
use std::fmt;

/// Header size: two six-byte MAC markers.
const HEADER_SIZE: usize = 6 + 6;

/// Trailing frame-check size.
const FCS_SIZE: usize = 4;

/// MAC-like address marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// The data-link layer, configured with this end's MAC markers.
#[derive(Debug)]
pub struct DataLinkLayer {
    local: MacAddr,
    remote: MacAddr,
}

impl DataLinkLayer {
    pub fn new(local: MacAddr, remote: MacAddr) -> Self {
        Self { local, remote }
    }
}

impl Layer for DataLinkLayer {
    fn name(&self) -> LayerName {
        LayerName::DataLink
    }

    fn encapsulate(&self, payload: &[u8], _ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        let mut envelope = Vec::with_capacity(HEADER_SIZE + payload.len() + FCS_SIZE);
        envelope.extend_from_slice(&self.local.0);
        envelope.extend_from_slice(&self.remote.0);
        envelope.extend_from_slice(payload);

        let fcs = codec::checksum(&envelope);
        envelope.extend_from_slice(&fcs.to_le_bytes());
        Ok(envelope)
    }

    fn decapsulate(&self, envelope: &[u8], _ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        if envelope.len() < HEADER_SIZE + FCS_SIZE {
            return Err(Error::TruncatedFrame {
                layer: LayerName::DataLink,
                required: HEADER_SIZE + FCS_SIZE,
                actual: envelope.len(),
            });
        }

        let body_end = envelope.len() - FCS_SIZE;
        // Bounds checked above; the slice is exactly 4 bytes.
        let carried = u32::from_le_bytes(envelope[body_end..].try_into().unwrap());
        let computed = codec::checksum(&envelope[..body_end]);

        if computed != carried {
            return Err(Error::ChecksumMismatch {
                layer: LayerName::DataLink,
                expected: carried,
                actual: computed,
            });
        }

        Ok(envelope[HEADER_SIZE..body_end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionId;

    fn ctx() -> PipelineContext {
        PipelineContext::for_receive(SessionId::from("s"), 1)
    }

    fn layer() -> DataLinkLayer {
        DataLinkLayer::new(
            MacAddr([0x11; 6]),
            MacAddr([0x22; 6]),
        )
    }

    #[test]
    fn test_round_trip() {
        let payload = b"frame payload";
        let envelope = layer().encapsulate(payload, &mut ctx()).unwrap();
        let restored = layer().decapsulate(&envelope, &mut ctx()).unwrap();
        assert_eq!(restored, payload);
    }

    #[test]
    fn test_empty_payload_round_trip() {
        let envelope = layer().encapsulate(b"", &mut ctx()).unwrap();
        assert_eq!(envelope.len(), HEADER_SIZE + FCS_SIZE);
        let restored = layer().decapsulate(&envelope, &mut ctx()).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_any_body_bit_flip_detected() {
        let envelope = layer().encapsulate(b"protected", &mut ctx()).unwrap();

        for byte_idx in 0..envelope.len() {
            let mut tampered = envelope.clone();
            tampered[byte_idx] ^= 0x01;

            let result = layer().decapsulate(&tampered, &mut ctx());
            assert!(
                matches!(
                    result,
                    Err(Error::ChecksumMismatch {
                        layer: LayerName::DataLink,
                        ..
                    })
                ),
                "flip at byte {byte_idx} went undetected"
            );
        }
    }

    #[test]
    fn test_fcs_region_bit_flip_detected() {
        let envelope = layer().encapsulate(b"payload", &mut ctx()).unwrap();
        let fcs_start = envelope.len() - FCS_SIZE;

        for bit in 0..(FCS_SIZE * 8) {
            let mut tampered = envelope.clone();
            tampered[fcs_start + bit / 8] ^= 1 << (bit % 8);

            let result = layer().decapsulate(&tampered, &mut ctx());
            assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
        }
    }

    #[test]
    fn test_truncated() {
        let result = layer().decapsulate(&[0u8; 15], &mut ctx());
        assert!(matches!(result, Err(Error::TruncatedFrame { .. })));
    }

    #[test]
    fn test_mac_display() {
        let mac = MacAddr([0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]);
        assert_eq!(mac.to_string(), "de:ad:be:ef:00:01");
    }
}
