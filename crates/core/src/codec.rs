//! Stateless codec primitives shared by the layers.
//!
//! Three families:
//! - `checksum`: CRC-32 integrity digest (transport segments, data-link frames)
//! - `compress`/`decompress`: zlib, lossless
//! - `cipher`/`decipher`: repeating-key XOR, involutive
//!
//! None of these hold state; they are plain functions over byte slices so
//! any number of concurrent pipelines can share them.

use crate::error::{Error, Result};
use crate::layer::LayerName;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// CRC-32 digest over a byte sequence.
///
/// Deterministic: same input, same output. A single-bit change in the input
/// changes the output (standard CRC property), which is what the transport
/// and data-link layers rely on for corruption detection.
pub fn checksum(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Compress a byte sequence with zlib.
///
/// `decompress(compress(x)) == x` for all inputs, including empty ones.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Decompress a zlib stream.
///
/// Fails with `MalformedPayload` (attributed to the presentation layer,
/// the only consumer of compression in this stack) when the input is not
/// valid zlib output.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::MalformedPayload {
            layer: LayerName::Presentation,
            detail: format!("zlib decompression failed: {e}"),
        })?;
    Ok(out)
}

/// Symmetric cipher key. Rejects empty keys at construction so the XOR
/// transform is never a silent identity by accident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherKey(Vec<u8>);

impl CipherKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::MalformedPayload {
                layer: LayerName::Presentation,
                detail: "cipher key must not be empty".to_string(),
            });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Repeating-key XOR transform.
///
/// Involutive: applying it twice with the same key restores the input.
/// This is obfuscation, not authenticated encryption; a wrong key produces
/// garbage that fails structure checks further up the stack, never a panic.
pub fn cipher(bytes: &[u8], key: &CipherKey) -> Vec<u8> {
    let key = key.as_bytes();
    bytes
        .iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect()
}

/// Inverse of [`cipher`]. Same operation, named for call-site clarity.
pub fn decipher(bytes: &[u8], key: &CipherKey) -> Vec<u8> {
    cipher(bytes, key)
}
