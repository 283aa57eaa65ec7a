//! Layer 3: network.
//!
//! Stamps source and destination address markers. The markers are
//! illustrative: decapsulation checks that they are present and
//! well-formed, but no routing decision is ever made on them and they are
//! not compared against any topology.
//!
//! # Header Format
//!
//! ```text
//! +-----------------+
//! | src_addr (4)    |  IPv4-like marker
//! +-----------------+
//! | dst_addr (4)    |  IPv4-like marker
//! +-----------------+
//! | payload         |
//! +-----------------+
//! ```

use crate::context::PipelineContext;
use crate::error::{Error, Result};
use crate::layer::{Layer, LayerName};
use std::fmt;

/// Header size: two four-byte address markers.
const HEADER_SIZE: usize = 4 + 4;

/// IPv4-like address marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetAddr(pub [u8; 4]);

impl fmt::Display for NetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

/// The network layer, configured with this end's address markers.
#[derive(Debug)]
pub struct NetworkLayer {
    local: NetAddr,
    remote: NetAddr,
}

impl NetworkLayer {
    pub fn new(local: NetAddr, remote: NetAddr) -> Self {
        Self { local, remote }
    }
}

impl Layer for NetworkLayer {
    fn name(&self) -> LayerName {
        LayerName::Network
    }

    fn encapsulate(&self, payload: &[u8], _ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        let mut envelope = Vec::with_capacity(HEADER_SIZE + payload.len());
        envelope.extend_from_slice(&self.local.0);
        envelope.extend_from_slice(&self.remote.0);
        envelope.extend_from_slice(payload);
        Ok(envelope)
    }

    fn decapsulate(&self, envelope: &[u8], _ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        // Structural validation only: both markers must be present.
        if envelope.len() < HEADER_SIZE {
            return Err(Error::TruncatedFrame {
                layer: LayerName::Network,
                required: HEADER_SIZE,
                actual: envelope.len(),
            });
        }
        Ok(envelope[HEADER_SIZE..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionId;

    fn ctx() -> PipelineContext {
        PipelineContext::for_receive(SessionId::from("s"), 1)
    }

    fn layer() -> NetworkLayer {
        NetworkLayer::new(NetAddr([10, 0, 0, 1]), NetAddr([10, 0, 0, 2]))
    }

    #[test]
    fn test_round_trip() {
        let payload = b"datagram payload";
        let envelope = layer().encapsulate(payload, &mut ctx()).unwrap();
        let restored = layer().decapsulate(&envelope, &mut ctx()).unwrap();
        assert_eq!(restored, payload);
    }

    #[test]
    fn test_addresses_are_stamped() {
        let envelope = layer().encapsulate(b"x", &mut ctx()).unwrap();
        assert_eq!(&envelope[0..4], &[10, 0, 0, 1]);
        assert_eq!(&envelope[4..8], &[10, 0, 0, 2]);
    }

    #[test]
    fn test_markers_not_routed_on() {
        // A frame stamped by a different host still decapsulates: markers
        // are illustrative metadata, not an operative destination check.
        let other = NetworkLayer::new(NetAddr([192, 168, 0, 9]), NetAddr([192, 168, 0, 8]));
        let envelope = other.encapsulate(b"payload", &mut ctx()).unwrap();

        let restored = layer().decapsulate(&envelope, &mut ctx()).unwrap();
        assert_eq!(restored, b"payload");
    }

    #[test]
    fn test_truncated() {
        let result = layer().decapsulate(&[10, 0, 0], &mut ctx());
        assert!(matches!(result, Err(Error::TruncatedFrame { .. })));
    }

    #[test]
    fn test_addr_display() {
        assert_eq!(NetAddr([10, 0, 0, 1]).to_string(), "10.0.0.1");
    }
}
