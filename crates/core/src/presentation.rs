//! Layer 6: presentation.
//!
//! Transforms the payload for transit: compress first, then encipher with
//! the connection key. Decapsulation runs the exact reverse — decipher,
//! then decompress — and cross-checks the declared transform flags and
//! original length against what actually comes out.
//!
//! # Header Format
//!
//! ```text
//! +-----------------+
//! | flags (1)       |  bit0 = compressed, bit1 = enciphered
//! +-----------------+
//! | orig_len (4)    |  u32 little-endian, pre-transform payload length
//! +-----------------+
//! | transformed     |  cipher(compress(payload))
//! | (variable)      |
//! +-----------------+
//! ```
//!
//! A wrong connection key does not fail here deterministically: deciphering
//! with it yields bytes that are overwhelmingly unlikely to be a valid zlib
//! stream, so the failure surfaces as `MalformedPayload`. There is no
//! authenticated-encryption guarantee, by contract.

use crate::codec::{self, CipherKey};
use crate::context::PipelineContext;
use crate::error::{Error, Result};
use crate::layer::{Layer, LayerName};

const FLAG_COMPRESSED: u8 = 0b01;
const FLAG_ENCIPHERED: u8 = 0b10;

/// Both transforms are always applied in this stack.
const FLAGS_APPLIED: u8 = FLAG_COMPRESSED | FLAG_ENCIPHERED;

/// Header size: flags byte plus original-length word.
const HEADER_SIZE: usize = 1 + 4;

/// The presentation layer, bound to the connection's cipher key.
#[derive(Debug)]
pub struct PresentationLayer {
    key: CipherKey,
}

impl PresentationLayer {
    pub fn new(key: CipherKey) -> Self {
        Self { key }
    }
}

impl Layer for PresentationLayer {
    fn name(&self) -> LayerName {
        LayerName::Presentation
    }

    fn encapsulate(&self, payload: &[u8], _ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        let compressed = codec::compress(payload)?;
        let transformed = codec::cipher(&compressed, &self.key);

        let mut envelope = Vec::with_capacity(HEADER_SIZE + transformed.len());
        envelope.push(FLAGS_APPLIED);
        envelope.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        envelope.extend_from_slice(&transformed);
        Ok(envelope)
    }

    fn decapsulate(&self, envelope: &[u8], _ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        if envelope.len() < HEADER_SIZE {
            return Err(Error::TruncatedFrame {
                layer: LayerName::Presentation,
                required: HEADER_SIZE,
                actual: envelope.len(),
            });
        }

        let flags = envelope[0];
        if flags != FLAGS_APPLIED {
            return Err(Error::MalformedPayload {
                layer: LayerName::Presentation,
                detail: format!(
                    "transform flags {flags:#04b} disagree with expected {FLAGS_APPLIED:#04b}"
                ),
            });
        }

        // Bounds checked above; the slice is exactly 4 bytes.
        let orig_len = u32::from_le_bytes(envelope[1..HEADER_SIZE].try_into().unwrap()) as usize;

        // Exact reverse of encapsulation: decipher, then decompress.
        let deciphered = codec::decipher(&envelope[HEADER_SIZE..], &self.key);
        let payload = codec::decompress(&deciphered)?;

        if payload.len() != orig_len {
            return Err(Error::MalformedPayload {
                layer: LayerName::Presentation,
                detail: format!(
                    "declared original length {orig_len}, decompressed to {}",
                    payload.len()
                ),
            });
        }

        Ok(payload)
    }
}
