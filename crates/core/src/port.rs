//! Delivery port: the opaque duplex channel under the stack.
//!
//! The pipeline never does I/O itself; it hands fully framed bytes to a
//! [`DeliveryPort`] and pulls complete frames back out of one. Ports block
//! on `receive` until a frame is available and fail with `Io` when the
//! underlying connection is gone.
//!
//! [`InMemoryLink`] is the in-process implementation used by the tests and
//! the loopback demo: two connected ends over a pair of channels. A
//! TCP-backed port lives with the harness, not here.

use crate::error::{Error, Result};
use std::io;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Duplex byte-frame channel consumed by the stack controller.
pub trait DeliveryPort {
    /// Transmit one complete frame. Fails with `Io` on a broken connection.
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Block until one complete frame is available and return it.
    /// Fails with `Io` on disconnect.
    fn receive(&mut self) -> Result<Vec<u8>>;
}

/// One end of an in-memory duplex link.
///
/// Each end owns its half exclusively; the two ends can live on different
/// threads. Dropping one end makes the peer's calls fail with `Io`, the
/// same observable behavior as a closed socket.
pub struct InMemoryLink {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

impl InMemoryLink {
    /// Create two connected ends.
    pub fn pair() -> (InMemoryLink, InMemoryLink) {
        let (a_tx, b_rx) = channel();
        let (b_tx, a_rx) = channel();
        (
            InMemoryLink { tx: a_tx, rx: a_rx },
            InMemoryLink { tx: b_tx, rx: b_rx },
        )
    }
}

impl DeliveryPort for InMemoryLink {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.tx.send(frame.to_vec()).map_err(|_| {
            Error::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "peer end of the link is gone",
            ))
        })
    }

    fn receive(&mut self) -> Result<Vec<u8>> {
        self.rx.recv().map_err(|_| {
            Error::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "peer end of the link is gone",
            ))
        })
    }
}
