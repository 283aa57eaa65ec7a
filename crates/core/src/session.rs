//! Layer 5: session.
//!
//! Stamps the connection's session identifier so the receiver can verify
//! that a frame belongs to its logical connection.
//!
//! # Header Format
//!
//! ```text
//! +-----------------+
//! | id_len (1)      |  u8, 1..=255
//! +-----------------+
//! | session_id      |  id_len bytes, opaque token
//! +-----------------+
//! | payload         |
//! +-----------------+
//! ```

use crate::context::PipelineContext;
use crate::error::{Error, Result};
use crate::layer::{Layer, LayerName};

/// The session layer. The bound id comes from the context, never from
/// layer-internal state.
#[derive(Debug, Default)]
pub struct SessionLayer;

impl Layer for SessionLayer {
    fn name(&self) -> LayerName {
        LayerName::Session
    }

    fn encapsulate(&self, payload: &[u8], ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        let id = ctx.session_id().as_bytes();
        if id.is_empty() || id.len() > u8::MAX as usize {
            return Err(Error::MalformedPayload {
                layer: LayerName::Session,
                detail: format!("session id length {} outside 1..=255", id.len()),
            });
        }

        let mut envelope = Vec::with_capacity(1 + id.len() + payload.len());
        envelope.push(id.len() as u8);
        envelope.extend_from_slice(id);
        envelope.extend_from_slice(payload);
        Ok(envelope)
    }

    fn decapsulate(&self, envelope: &[u8], ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        if envelope.is_empty() {
            return Err(Error::TruncatedFrame {
                layer: LayerName::Session,
                required: 2,
                actual: 0,
            });
        }

        let id_len = envelope[0] as usize;
        if id_len == 0 {
            return Err(Error::MalformedPayload {
                layer: LayerName::Session,
                detail: "zero-length session id".to_string(),
            });
        }
        if envelope.len() < 1 + id_len {
            return Err(Error::TruncatedFrame {
                layer: LayerName::Session,
                required: 1 + id_len,
                actual: envelope.len(),
            });
        }

        let carried = &envelope[1..1 + id_len];
        if carried != ctx.session_id().as_bytes() {
            return Err(Error::SessionMismatch {
                expected: ctx.session_id().to_string(),
                actual: String::from_utf8_lossy(carried).into_owned(),
            });
        }

        Ok(envelope[1 + id_len..].to_vec())
    }
}
