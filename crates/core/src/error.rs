//! Error types for the layered stack.
//!
//! Every failure is classified at the layer that detected it and carries
//! enough structure to say which invariant was violated. Errors propagate
//! unmodified to the stack controller's caller; nothing inside the pipeline
//! retries or masks them.

use crate::layer::LayerName;
use thiserror::Error;

/// Top-level error type for all pipeline operations.
///
/// Each variant corresponds to one failure class:
/// - Truncation: not enough bytes to parse a layer header
/// - Checksum: an integrity digest disagrees with the carried value
/// - Sequence: a segment arrived out of strict order
/// - Session: the frame belongs to a different logical connection
/// - Malformed: a payload fails structural decoding (flags, lengths, codecs)
/// - I/O: the delivery port itself failed, not attributable to any layer
#[derive(Debug, Error)]
pub enum Error {
    /// Insufficient bytes to parse a header at the named layer.
    #[error("{layer} frame truncated: need at least {required} bytes, got {actual}")]
    TruncatedFrame {
        layer: LayerName,
        required: usize,
        actual: usize,
    },

    /// Recomputed integrity value disagrees with the carried value.
    /// Signals corruption or tampering in transit.
    #[error("{layer} checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        layer: LayerName,
        expected: u32,
        actual: u32,
    },

    /// Transport sequence number is not the next expected value.
    /// Signals reordering, duplication, or a lost frame.
    #[error("sequence violation: expected {expected}, got {actual}")]
    SequenceViolation { expected: u64, actual: u64 },

    /// Session identifier does not match the bound connection.
    #[error("session mismatch: connection bound to {expected:?}, frame carries {actual:?}")]
    SessionMismatch { expected: String, actual: String },

    /// Structural decoding failed at the named layer (bad flags, length
    /// disagreement, undecodable compressed or enciphered content).
    #[error("{layer} malformed payload: {detail}")]
    MalformedPayload { layer: LayerName, detail: String },

    /// Delivery port failure (broken connection, closed channel).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The layer this error is attributed to, if any.
    ///
    /// `Io` has no layer: the delivery port sits below the whole stack.
    pub fn layer(&self) -> Option<LayerName> {
        match self {
            Error::TruncatedFrame { layer, .. } => Some(*layer),
            Error::ChecksumMismatch { layer, .. } => Some(*layer),
            Error::SequenceViolation { .. } => Some(LayerName::Transport),
            Error::SessionMismatch { .. } => Some(LayerName::Session),
            Error::MalformedPayload { layer, .. } => Some(*layer),
            Error::Io(_) => None,
        }
    }
}

/// Type alias for Result with our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names_layer() {
        let err = Error::TruncatedFrame {
            layer: LayerName::Physical,
            required: 5,
            actual: 2,
        };
        assert_eq!(err.layer(), Some(LayerName::Physical));
        assert!(err.to_string().contains("physical"));
    }

    #[test]
    fn test_sequence_violation_is_transport() {
        let err = Error::SequenceViolation {
            expected: 2,
            actual: 4,
        };
        assert_eq!(err.layer(), Some(LayerName::Transport));
    }

    #[test]
    fn test_io_error_has_no_layer() {
        let err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "peer closed",
        ));
        assert_eq!(err.layer(), None);
    }
}
