//! Connection harness: TCP delivery port, accept loop, shutdown.
//!
//! The pipeline treats the transport as an opaque duplex channel; this
//! module supplies that channel over TCP and owns everything the core
//! deliberately does not: sockets, worker threads, and shutdown. One
//! worker thread per accepted connection, each owning its stack controller
//! exclusively, so the pipeline itself needs no locking.

use crate::config::{Config, Side};
use crate::message_gen::generate_requests;
use layerstack_core::{
    physical, DeliveryPort, Error, Message, Result, StackConfig, StackController, StackMetrics,
};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cooperative shutdown signal shared between the accept loop and its
/// owner. Triggering stops accepting new connections; in-flight pipeline
/// calls run to completion on their worker threads.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Delivery port over a TCP stream.
///
/// `receive` reads the physical-layer prologue off the stream to learn the
/// frame length, then pulls exactly one complete frame. The stack's
/// physical layer re-validates the framing; this port only needs to know
/// where a frame ends.
pub struct TcpPort {
    stream: TcpStream,
}

impl TcpPort {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl DeliveryPort for TcpPort {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.stream.write_all(frame)?;
        self.stream.flush()?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<u8>> {
        let mut prologue = [0u8; physical::PROLOGUE_SIZE];
        self.stream.read_exact(&mut prologue)?;
        let frame_len = physical::parse_prologue(&prologue)?;

        let mut frame = vec![0u8; physical::PROLOGUE_SIZE + frame_len];
        frame[..physical::PROLOGUE_SIZE].copy_from_slice(&prologue);
        self.stream.read_exact(&mut frame[physical::PROLOGUE_SIZE..])?;
        Ok(frame)
    }
}

/// Accept connections until the token triggers, one worker thread per
/// connection. Returns once every worker has finished.
pub fn run_server(listener: TcpListener, config: &Config, token: &ShutdownToken) -> Result<()> {
    listener.set_nonblocking(true)?;
    info!(addr = %listener.local_addr()?, "server listening");

    let mut workers = Vec::new();
    loop {
        if token.is_triggered() {
            debug!("shutdown triggered, no longer accepting");
            break;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "accepted connection");
                stream.set_nonblocking(false)?;
                let stack_config = config
                    .stack_config(Side::Server)
                    .map_err(|e| Error::Io(std::io::Error::new(ErrorKind::InvalidInput, e)))?;
                workers.push(thread::spawn(move || {
                    serve_connection(stream, stack_config);
                }));
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(25));
            }
            Err(e) => return Err(e.into()),
        }
    }

    for worker in workers {
        let _ = worker.join();
    }
    Ok(())
}

/// One connection's worker: receive requests, echo each body back under an
/// "OK" tag. A port failure means the peer is gone; any classified layer
/// error terminates the connection — the pipeline never retries, and this
/// harness chooses termination over retry.
fn serve_connection(stream: TcpStream, stack_config: StackConfig) {
    let mut controller = StackController::new(TcpPort::new(stream), stack_config);

    loop {
        let request = match controller.receive() {
            Ok(request) => request,
            Err(Error::Io(e)) => {
                debug!(error = %e, "peer disconnected");
                break;
            }
            Err(e) => {
                warn!(error = %e, "terminating connection on pipeline error");
                break;
            }
        };

        let response = match Message::new("OK", request.body().to_vec()) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "could not build response");
                break;
            }
        };
        if let Err(e) = controller.send(&response) {
            warn!(error = %e, "response send failed");
            break;
        }
    }

    let metrics = controller.close();
    info!("\n{}", metrics.report());
}

/// Connect to the server (with a short retry window for the in-process
/// demo, where the accept loop may not be up yet), send the generated
/// requests, and verify every echo.
pub fn run_client(config: &Config, port: u16) -> Result<StackMetrics> {
    let addr = format!("{}:{}", config.host, port);
    let stream = connect_with_retry(&addr)?;
    let stack_config = config
        .stack_config(Side::Client)
        .map_err(|e| Error::Io(std::io::Error::new(ErrorKind::InvalidInput, e)))?;
    let mut controller = StackController::new(TcpPort::new(stream), stack_config);

    let requests = generate_requests(config.seed, config.messages, config.payload_bytes)?;
    for (i, request) in requests.iter().enumerate() {
        controller.send(request)?;
        let response = controller.receive()?;

        if response.tag() != "OK" || response.body() != request.body() {
            warn!(request = i, "echo mismatch");
            return Err(Error::Io(std::io::Error::new(
                ErrorKind::InvalidData,
                "server echo did not match request",
            )));
        }
        debug!(request = i, tag = request.tag(), "echo verified");
    }

    Ok(controller.close())
}

fn connect_with_retry(addr: &str) -> Result<TcpStream> {
    let mut last_err = None;
    for _ in 0..40 {
        match TcpStream::connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                last_err = Some(e);
                thread::sleep(Duration::from_millis(50));
            }
        }
    }
    Err(last_err
        .unwrap_or_else(|| std::io::Error::new(ErrorKind::TimedOut, "connect retries exhausted"))
        .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerstack_core::physical::{PREAMBLE, PROLOGUE_SIZE};

    #[test]
    fn test_tcp_port_frames_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut port = TcpPort::new(stream);
            let frame = port.receive().unwrap();
            port.send(&frame).unwrap();
        });

        let mut port = TcpPort::new(TcpStream::connect(addr).unwrap());

        let mut frame = vec![PREAMBLE];
        frame.extend_from_slice(&3u32.to_le_bytes());
        frame.extend_from_slice(b"abc");
        assert_eq!(frame.len(), PROLOGUE_SIZE + 3);

        port.send(&frame).unwrap();
        assert_eq!(port.receive().unwrap(), frame);
        handle.join().unwrap();
    }

    #[test]
    fn test_shutdown_token() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        assert!(!clone.is_triggered());
        token.trigger();
        assert!(clone.is_triggered());
    }

    #[test]
    fn test_server_stops_on_trigger() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let config = Config::from_args(&[]).unwrap();
        let token = ShutdownToken::new();

        let loop_token = token.clone();
        let handle = thread::spawn(move || run_server(listener, &config, &loop_token));

        token.trigger();
        handle.join().unwrap().unwrap();
    }
}
