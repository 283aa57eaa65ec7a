//! The stack controller: composes the seven layers in fixed order and
//! drives full traversals.
//!
//! On `send`, the controller threads the growing envelope top to bottom
//! (application → physical) and hands the final frame to the delivery
//! port. On `receive`, it pulls one frame from the port and unwraps bottom
//! to top, failing fast at the first layer whose validation rejects the
//! bytes — content above a failed layer is meaningless, so nothing tries
//! to continue past it.
//!
//! # Connection-scoped state
//!
//! The controller exclusively owns the session id and both sequence
//! counters for its connection. Counters are advanced only after a whole
//! traversal (including port I/O) succeeds; a failing layer leaves them
//! untouched, so one bad frame never poisons the connection's state.

use crate::application::{ApplicationLayer, Message};
use crate::codec::CipherKey;
use crate::context::{PipelineContext, SessionId};
use crate::datalink::{DataLinkLayer, MacAddr};
use crate::error::{Error, Result};
use crate::layer::Layer;
use crate::metrics::StackMetrics;
use crate::network::{NetAddr, NetworkLayer};
use crate::physical::PhysicalLayer;
use crate::port::DeliveryPort;
use crate::presentation::PresentationLayer;
use crate::session::SessionLayer;
use crate::transport::{TransportLayer, INITIAL_SEQUENCE};
use tracing::{debug, trace, warn};

/// Everything a controller needs at construction. The harness passes these
/// through from its configuration unchanged.
#[derive(Debug, Clone)]
pub struct StackConfig {
    pub session_id: SessionId,
    pub cipher_key: CipherKey,
    pub local_addr: NetAddr,
    pub remote_addr: NetAddr,
    pub local_mac: MacAddr,
    pub remote_mac: MacAddr,
}

/// Drives one connection's pipeline over a delivery port.
pub struct StackController<P: DeliveryPort> {
    port: P,
    /// Fixed order, top (application) to bottom (physical).
    layers: [Box<dyn Layer>; 7],
    session_id: SessionId,
    /// Next sequence number to assign on send.
    send_seq: u64,
    /// Next sequence number expected on receive.
    recv_seq: u64,
    metrics: StackMetrics,
}

impl<P: DeliveryPort> StackController<P> {
    pub fn new(port: P, config: StackConfig) -> Self {
        let layers: [Box<dyn Layer>; 7] = [
            Box::new(ApplicationLayer),
            Box::new(PresentationLayer::new(config.cipher_key)),
            Box::new(SessionLayer),
            Box::new(TransportLayer),
            Box::new(NetworkLayer::new(config.local_addr, config.remote_addr)),
            Box::new(DataLinkLayer::new(config.local_mac, config.remote_mac)),
            Box::new(PhysicalLayer),
        ];
        Self {
            port,
            layers,
            session_id: config.session_id,
            send_seq: INITIAL_SEQUENCE,
            recv_seq: INITIAL_SEQUENCE,
            metrics: StackMetrics::new(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn metrics(&self) -> &StackMetrics {
        &self.metrics
    }

    /// Encapsulate `message` through every layer and transmit the frame.
    ///
    /// Aborts on the first layer or port failure with nothing transmitted
    /// and no connection state mutated.
    pub fn send(&mut self, message: &Message) -> Result<()> {
        let mut ctx = PipelineContext::for_send(
            self.session_id.clone(),
            self.send_seq,
            message.tag().to_string(),
        );

        match self.drive_send(message, &mut ctx) {
            Ok(wire_len) => {
                // Commit connection state only now that the whole
                // traversal and the port hand-off succeeded.
                self.send_seq += 1;
                self.metrics.messages_sent += 1;
                self.metrics.bytes_sent += wire_len as u64;
                self.metrics.payload_bytes_sent += message.body().len() as u64;
                debug!(
                    session = %self.session_id,
                    seq = ctx.sequence(),
                    tag = message.tag(),
                    wire_len,
                    "sent"
                );
                Ok(())
            }
            Err(err) => {
                self.metrics.send_failures += 1;
                warn!(session = %self.session_id, error = %err, "send aborted");
                Err(err)
            }
        }
    }

    fn drive_send(&mut self, message: &Message, ctx: &mut PipelineContext) -> Result<usize> {
        let mut bytes = message.body().to_vec();
        for layer in self.layers.iter() {
            let before = bytes.len();
            bytes = layer.encapsulate(&bytes, ctx)?;
            ctx.record(layer.name(), before, bytes.len());
            trace!(layer = %layer.name(), bytes_in = before, bytes_out = bytes.len(), "encapsulated");
        }
        self.port.send(&bytes)?;
        Ok(bytes.len())
    }

    /// Pull one frame from the port and decapsulate it to a [`Message`].
    ///
    /// Fails fast at the first layer whose validation rejects the frame;
    /// the classified error reaches the caller unmodified and the expected
    /// sequence number stays where it was.
    pub fn receive(&mut self) -> Result<Message> {
        let frame = match self.port.receive() {
            Ok(frame) => frame,
            Err(err) => {
                self.metrics.receive_failures += 1;
                warn!(session = %self.session_id, error = %err, "receive aborted at port");
                return Err(err);
            }
        };
        let wire_len = frame.len();

        let mut ctx = PipelineContext::for_receive(self.session_id.clone(), self.recv_seq);
        match self.drive_receive(frame, &mut ctx) {
            Ok(message) => {
                self.recv_seq += 1;
                self.metrics.messages_received += 1;
                self.metrics.bytes_received += wire_len as u64;
                debug!(
                    session = %self.session_id,
                    seq = ctx.sequence(),
                    tag = message.tag(),
                    wire_len,
                    "received"
                );
                Ok(message)
            }
            Err(err) => {
                self.metrics.receive_failures += 1;
                warn!(
                    session = %self.session_id,
                    layer = %err.layer().map(|l| l.to_string()).unwrap_or_default(),
                    error = %err,
                    "receive aborted"
                );
                Err(err)
            }
        }
    }

    fn drive_receive(&mut self, frame: Vec<u8>, ctx: &mut PipelineContext) -> Result<Message> {
        let mut bytes = frame;
        for layer in self.layers.iter().rev() {
            let before = bytes.len();
            bytes = layer.decapsulate(&bytes, ctx)?;
            ctx.record(layer.name(), before, bytes.len());
            trace!(layer = %layer.name(), bytes_in = before, bytes_out = bytes.len(), "decapsulated");
        }

        let tag = ctx.message_tag.take().ok_or_else(|| Error::MalformedPayload {
            layer: crate::layer::LayerName::Application,
            detail: "application layer produced no message tag".to_string(),
        })?;
        Message::new(tag, bytes)
    }

    /// Release the connection-scoped state, logging a final summary.
    /// Returns the metrics so the harness can report them.
    pub fn close(self) -> StackMetrics {
        debug!(session = %self.session_id, "connection closed");
        self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::InMemoryLink;

    fn config(session: &str, key: &[u8]) -> StackConfig {
        StackConfig {
            session_id: SessionId::from(session),
            cipher_key: CipherKey::new(key.to_vec()).unwrap(),
            local_addr: NetAddr([10, 0, 0, 1]),
            remote_addr: NetAddr([10, 0, 0, 2]),
            local_mac: MacAddr([0x11; 6]),
            remote_mac: MacAddr([0x22; 6]),
        }
    }

    fn linked_pair(
        session: &str,
        key: &[u8],
    ) -> (StackController<InMemoryLink>, StackController<InMemoryLink>) {
        let (a, b) = InMemoryLink::pair();
        (
            StackController::new(a, config(session, key)),
            StackController::new(b, config(session, key)),
        )
    }

    #[test]
    fn test_send_receive_round_trip() {
        let (mut sender, mut receiver) = linked_pair("sess-1", b"k1");

        let message = Message::new("GET", b"/index.html".to_vec()).unwrap();
        sender.send(&message).unwrap();

        let received = receiver.receive().unwrap();
        assert_eq!(received, message);
    }

    #[test]
    fn test_sequence_advances_per_message() {
        let (mut sender, mut receiver) = linked_pair("sess-1", b"k1");

        for i in 0..5u8 {
            let message = Message::new("PUT", vec![i; 10]).unwrap();
            sender.send(&message).unwrap();
            assert_eq!(receiver.receive().unwrap(), message);
        }

        assert_eq!(sender.metrics().messages_sent, 5);
        assert_eq!(receiver.metrics().messages_received, 5);
    }

    /// Capture the raw wire frame a sender controller produces for `message`.
    fn frame_for(message: &Message, session: &str, key: &[u8]) -> Vec<u8> {
        let (s_end, mut capture) = InMemoryLink::pair();
        let mut sender = StackController::new(s_end, config(session, key));
        sender.send(message).unwrap();
        capture.receive().unwrap()
    }

    #[test]
    fn test_failed_receive_does_not_advance_state() {
        let (mut injector, r_end) = InMemoryLink::pair();
        let mut receiver = StackController::new(r_end, config("sess-1", b"k1"));

        let message = Message::new("GET", b"payload".to_vec()).unwrap();
        let frame = frame_for(&message, "sess-1", b"k1");

        // Garbage first: the receive fails and the expected sequence
        // number stays at its initial value.
        injector.send(b"\xAAnot a frame").unwrap();
        assert!(receiver.receive().is_err());
        assert_eq!(receiver.metrics().receive_failures, 1);

        // A valid first frame still decapsulates afterwards.
        injector.send(&frame).unwrap();
        assert_eq!(receiver.receive().unwrap(), message);
    }

    #[test]
    fn test_io_error_when_peer_gone() {
        let (a, _) = InMemoryLink::pair();
        let mut controller = StackController::new(a, config("sess-1", b"k1"));

        let message = Message::new("GET", b"x".to_vec()).unwrap();
        let result = controller.send(&message);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_close_returns_metrics() {
        let (mut sender, receiver) = linked_pair("sess-1", b"k1");
        drop(receiver);

        let _ = sender.send(&Message::new("GET", b"x".to_vec()).unwrap());
        let metrics = sender.close();
        assert_eq!(metrics.send_failures, 1);
    }
}
