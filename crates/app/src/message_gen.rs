//! Request message generation for the demo client.
//!
//! Generated bodies mix compressibility levels so the presentation layer's
//! behavior is visible in the metrics: runs of one byte, limited-alphabet
//! text, and incompressible random bytes.

use layerstack_core::{Message, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const TAGS: &[&str] = &["GET", "PUT", "POST"];

/// Generate `count` request messages of roughly `size_bytes` each.
///
/// Deterministic: same seed, same messages.
pub fn generate_requests(seed: u64, count: usize, size_bytes: usize) -> Result<Vec<Message>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    (0..count)
        .map(|_| {
            let tag = TAGS[rng.gen_range(0..TAGS.len())];
            let body = generate_body(&mut rng, size_bytes);
            Message::new(tag, body)
        })
        .collect()
}

fn generate_body(rng: &mut ChaCha8Rng, size_bytes: usize) -> Vec<u8> {
    let mut body = Vec::with_capacity(size_bytes);

    while body.len() < size_bytes {
        let chunk_size = (size_bytes - body.len()).min(512);
        let chunk_type: u8 = rng.gen_range(0..10);

        match chunk_type {
            // 40% highly compressible (runs of one byte)
            0..=3 => {
                let byte_value: u8 = rng.gen();
                body.extend(std::iter::repeat(byte_value).take(chunk_size));
            }

            // 40% moderately compressible (limited alphabet)
            4..=7 => {
                let alphabet = b"abcdefghijklmnopqrstuvwxyz /.-";
                for _ in 0..chunk_size {
                    body.push(alphabet[rng.gen_range(0..alphabet.len())]);
                }
            }

            // 20% incompressible (random bytes)
            _ => {
                for _ in 0..chunk_size {
                    body.push(rng.gen());
                }
            }
        }
    }

    body.truncate(size_bytes);
    body
}
