//! layerstack-core: Educational seven-layer encapsulation stack
//!
//! This library models a layered communication stack: a message created at
//! the application layer is progressively wrapped by six lower layers
//! before hitting a byte-stream connection, and symmetrically unwrapped in
//! reverse order on the receiving side.
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `codec`: stateless primitives (CRC-32, zlib, repeating-key XOR)
//! - `layer`: the `Layer` contract every stage implements
//! - `application` .. `physical`: the seven concrete layers, one module each
//! - `context`: per-call pipeline state and diagnostics trace
//! - `stack`: the controller composing the layers in fixed order
//! - `port`: the delivery-port boundary (the only place the stack blocks)
//! - `metrics`: observable per-connection behavior
//!
//! # Design Principles
//!
//! - **No panics**: every failure is a structured, classified error naming
//!   the layer that detected it
//! - **Symmetry**: `decapsulate(encapsulate(x)) == x` at every layer, for
//!   the whole stack, bit for bit
//! - **Deterministic detection**: corruption, reordering, duplication, and
//!   session mix-ups fail the same way every time
//! - **No hidden state**: connection-scoped counters live on the
//!   controller and are committed only after a traversal fully succeeds

pub mod application;
pub mod codec;
pub mod context;
pub mod datalink;
pub mod error;
pub mod layer;
pub mod metrics;
pub mod network;
pub mod physical;
pub mod port;
pub mod presentation;
pub mod session;
pub mod stack;
pub mod transport;

// Re-export commonly used types
pub use application::Message;
pub use codec::CipherKey;
pub use context::{PipelineContext, SessionId};
pub use datalink::MacAddr;
pub use error::{Error, Result};
pub use layer::{Layer, LayerName};
pub use metrics::StackMetrics;
pub use network::NetAddr;
pub use port::{DeliveryPort, InMemoryLink};
pub use stack::{StackConfig, StackController};
