//! Per-call pipeline state.
//!
//! A [`PipelineContext`] is built fresh by the stack controller for each
//! `send` or `receive` call and threaded through every layer of that one
//! traversal. It carries the connection-scoped values the layers need
//! (session id, sequence number) plus an accumulated diagnostic trace.
//!
//! The context never outlives one call. The connection-scoped counters it
//! is seeded from live on the controller and are only advanced after the
//! whole traversal succeeds, so a failing layer can never leave them
//! half-updated.

use crate::layer::LayerName;
use std::fmt;

/// Opaque token binding a sequence of messages to one logical connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Which way a traversal is moving through the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Top to bottom, wrapping (send path).
    Encapsulate,
    /// Bottom to top, validating and stripping (receive path).
    Decapsulate,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Encapsulate => f.write_str("encapsulate"),
            Direction::Decapsulate => f.write_str("decapsulate"),
        }
    }
}

/// One layer's contribution to a traversal, recorded for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub layer: LayerName,
    pub direction: Direction,
    pub bytes_in: usize,
    pub bytes_out: usize,
}

/// Ephemeral state for one full encapsulation or decapsulation pass.
#[derive(Debug)]
pub struct PipelineContext {
    session_id: SessionId,
    sequence: u64,
    direction: Direction,
    /// Message tag: set before encapsulation by the controller, written
    /// during decapsulation by the application layer.
    pub message_tag: Option<String>,
    trace: Vec<TraceRecord>,
}

impl PipelineContext {
    /// Context for a send: `sequence` is the number this message will carry.
    pub fn for_send(session_id: SessionId, sequence: u64, message_tag: String) -> Self {
        Self {
            session_id,
            sequence,
            direction: Direction::Encapsulate,
            message_tag: Some(message_tag),
            trace: Vec::new(),
        }
    }

    /// Context for a receive: `sequence` is the next expected number.
    pub fn for_receive(session_id: SessionId, sequence: u64) -> Self {
        Self {
            session_id,
            sequence,
            direction: Direction::Decapsulate,
            message_tag: None,
            trace: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// The sequence number to stamp (send) or to expect (receive).
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Record one layer's size transformation for diagnostics.
    pub fn record(&mut self, layer: LayerName, bytes_in: usize, bytes_out: usize) {
        self.trace.push(TraceRecord {
            layer,
            direction: self.direction,
            bytes_in,
            bytes_out,
        });
    }

    /// Trace of every layer this traversal has passed through, in order.
    pub fn trace(&self) -> &[TraceRecord] {
        &self.trace
    }
}
