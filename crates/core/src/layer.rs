//! The layer contract: one symmetric pair of operations per stack stage.
//!
//! Each of the seven layers wraps a payload with its own header on the way
//! down (`encapsulate`) and validates/strips that header on the way up
//! (`decapsulate`). The defining correctness property, per layer:
//!
//! ```text
//! decapsulate(encapsulate(x)) == x    for any well-formed x
//! ```
//!
//! Layers hold only immutable configuration (keys, addresses). All mutable
//! per-connection state (sequence number, session id, message tag, trace)
//! travels in the [`PipelineContext`], which makes one layer instance safe
//! to share across concurrent pipelines.

use crate::context::PipelineContext;
use crate::error::Result;
use std::fmt;

/// Identifies a stack layer, top (application) to bottom (physical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerName {
    Application,
    Presentation,
    Session,
    Transport,
    Network,
    DataLink,
    Physical,
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayerName::Application => "application",
            LayerName::Presentation => "presentation",
            LayerName::Session => "session",
            LayerName::Transport => "transport",
            LayerName::Network => "network",
            LayerName::DataLink => "data-link",
            LayerName::Physical => "physical",
        };
        f.write_str(name)
    }
}

/// One stage of the stack.
///
/// `encapsulate` never fails on well-formed input from the layer directly
/// above; it may read or write `ctx` (the application layer reads the
/// message tag, the transport layer reads the assigned sequence number).
///
/// `decapsulate` validates this layer's header and fails with a classified
/// [`crate::Error`] naming the layer and the violated invariant; on success
/// it returns the inner payload unchanged in content.
pub trait Layer: Send + Sync {
    fn name(&self) -> LayerName;

    fn encapsulate(&self, payload: &[u8], ctx: &mut PipelineContext) -> Result<Vec<u8>>;

    fn decapsulate(&self, envelope: &[u8], ctx: &mut PipelineContext) -> Result<Vec<u8>>;
}
