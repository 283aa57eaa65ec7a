//! Layer 7: application.
//!
//! Wraps the logical message body with its semantic tag and a length
//! prefix. This is the only layer that knows the payload is a [`Message`]
//! rather than opaque bytes.
//!
//! # Header Format
//!
//! ```text
//! +-----------------+
//! | tag_len (1)     |  u8, 1..=32
//! +-----------------+
//! | tag (variable)  |  printable ASCII, tag_len bytes
//! +-----------------+
//! | body_len (4)    |  u32 little-endian
//! +-----------------+
//! | body (variable) |  body_len bytes
//! +-----------------+
//! ```
//!
//! Decapsulation validates that the tag is structurally recognizable and
//! that the declared body length matches the bytes actually present, then
//! publishes the tag into the pipeline context for the controller.

use crate::context::PipelineContext;
use crate::error::{Error, Result};
use crate::layer::{Layer, LayerName};

/// Longest accepted message tag, in bytes.
pub const MAX_TAG_LEN: usize = 32;

/// Minimum header size: tag_len byte, one tag byte, body_len word.
const MIN_HEADER_SIZE: usize = 1 + 1 + 4;

/// An application-level logical message: free-form bytes plus a semantic
/// tag such as `"GET"` or `"OK"`. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    tag: String,
    body: Vec<u8>,
}

impl Message {
    /// Create a message, validating the tag (non-empty, at most
    /// [`MAX_TAG_LEN`] bytes, printable ASCII).
    pub fn new(tag: impl Into<String>, body: impl Into<Vec<u8>>) -> Result<Self> {
        let tag = tag.into();
        validate_tag(&tag)?;
        Ok(Self {
            tag,
            body: body.into(),
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

fn validate_tag(tag: &str) -> Result<()> {
    let ok = !tag.is_empty()
        && tag.len() <= MAX_TAG_LEN
        && tag.bytes().all(|b| b.is_ascii_graphic());
    if ok {
        Ok(())
    } else {
        Err(Error::MalformedPayload {
            layer: LayerName::Application,
            detail: format!("unrecognized message tag {tag:?}"),
        })
    }
}

/// The application layer. Stateless; the tag travels in the context.
#[derive(Debug, Default)]
pub struct ApplicationLayer;

impl Layer for ApplicationLayer {
    fn name(&self) -> LayerName {
        LayerName::Application
    }

    fn encapsulate(&self, payload: &[u8], ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        let tag = ctx.message_tag.clone().ok_or_else(|| Error::MalformedPayload {
            layer: LayerName::Application,
            detail: "no message tag bound to this send".to_string(),
        })?;
        validate_tag(&tag)?;

        let mut envelope = Vec::with_capacity(1 + tag.len() + 4 + payload.len());
        envelope.push(tag.len() as u8);
        envelope.extend_from_slice(tag.as_bytes());
        envelope.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        envelope.extend_from_slice(payload);
        Ok(envelope)
    }

    fn decapsulate(&self, envelope: &[u8], ctx: &mut PipelineContext) -> Result<Vec<u8>> {
        if envelope.len() < MIN_HEADER_SIZE {
            return Err(Error::TruncatedFrame {
                layer: LayerName::Application,
                required: MIN_HEADER_SIZE,
                actual: envelope.len(),
            });
        }

        let tag_len = envelope[0] as usize;
        let header_size = 1 + tag_len + 4;
        if tag_len == 0 || tag_len > MAX_TAG_LEN {
            return Err(Error::MalformedPayload {
                layer: LayerName::Application,
                detail: format!("tag length {tag_len} outside 1..={MAX_TAG_LEN}"),
            });
        }
        if envelope.len() < header_size {
            return Err(Error::TruncatedFrame {
                layer: LayerName::Application,
                required: header_size,
                actual: envelope.len(),
            });
        }

        let tag = std::str::from_utf8(&envelope[1..1 + tag_len])
            .map_err(|_| Error::MalformedPayload {
                layer: LayerName::Application,
                detail: "tag is not valid UTF-8".to_string(),
            })?
            .to_string();
        validate_tag(&tag)?;

        // Bounds checked above; the slice is exactly 4 bytes.
        let body_len =
            u32::from_le_bytes(envelope[1 + tag_len..header_size].try_into().unwrap()) as usize;

        let body = &envelope[header_size..];
        if body.len() != body_len {
            return Err(Error::MalformedPayload {
                layer: LayerName::Application,
                detail: format!("declared body length {body_len}, got {}", body.len()),
            });
        }

        ctx.message_tag = Some(tag);
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionId;

    fn send_ctx(tag: &str) -> PipelineContext {
        PipelineContext::for_send(SessionId::from("s"), 1, tag.to_string())
    }

    fn recv_ctx() -> PipelineContext {
        PipelineContext::for_receive(SessionId::from("s"), 1)
    }

    #[test]
    fn test_round_trip() {
        let layer = ApplicationLayer;
        let body = b"/index.html";

        let envelope = layer.encapsulate(body, &mut send_ctx("GET")).unwrap();

        let mut ctx = recv_ctx();
        let restored = layer.decapsulate(&envelope, &mut ctx).unwrap();

        assert_eq!(restored, body);
        assert_eq!(ctx.message_tag.as_deref(), Some("GET"));
    }

    #[test]
    fn test_empty_body_round_trip() {
        let layer = ApplicationLayer;
        let envelope = layer.encapsulate(b"", &mut send_ctx("PING")).unwrap();

        let mut ctx = recv_ctx();
        let restored = layer.decapsulate(&envelope, &mut ctx).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_truncated_header() {
        let layer = ApplicationLayer;
        let result = layer.decapsulate(&[3, b'G'], &mut recv_ctx());
        assert!(matches!(result, Err(Error::TruncatedFrame { .. })));
    }

    #[test]
    fn test_length_disagreement() {
        let layer = ApplicationLayer;
        let mut envelope = layer.encapsulate(b"body", &mut send_ctx("GET")).unwrap();
        envelope.pop(); // drop one body byte, header still claims 4

        let result = layer.decapsulate(&envelope, &mut recv_ctx());
        assert!(matches!(result, Err(Error::MalformedPayload { .. })));
    }

    #[test]
    fn test_unprintable_tag_rejected() {
        assert!(Message::new("\u{1}\u{2}", b"x".to_vec()).is_err());
        assert!(Message::new("", b"x".to_vec()).is_err());
        assert!(Message::new("A".repeat(MAX_TAG_LEN + 1), b"x".to_vec()).is_err());
    }

    #[test]
    fn test_message_accessors() {
        let msg = Message::new("GET", b"/index.html".to_vec()).unwrap();
        assert_eq!(msg.tag(), "GET");
        assert_eq!(msg.body(), b"/index.html");
    }
}
