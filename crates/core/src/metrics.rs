//! Per-connection counters for observable pipeline behavior.
//!
//! Updated explicitly by the stack controller at each send/receive; not
//! thread-safe on its own, which is fine because a controller (and thus
//! its metrics) is owned by exactly one worker.

use std::time::{Duration, Instant};

/// Counters for one connection's pipeline traffic.
#[derive(Debug, Clone)]
pub struct StackMetrics {
    /// When the connection was opened.
    pub opened_at: Instant,

    /// Messages successfully encapsulated and handed to the port.
    pub messages_sent: u64,

    /// Messages successfully decapsulated.
    pub messages_received: u64,

    /// Wire bytes handed to the port.
    pub bytes_sent: u64,

    /// Wire bytes pulled from the port.
    pub bytes_received: u64,

    /// Application-payload bytes before encapsulation.
    pub payload_bytes_sent: u64,

    /// Sends aborted by a layer or port failure.
    pub send_failures: u64,

    /// Receives aborted by a layer or port failure.
    pub receive_failures: u64,
}

impl StackMetrics {
    pub fn new() -> Self {
        Self {
            opened_at: Instant::now(),
            messages_sent: 0,
            messages_received: 0,
            bytes_sent: 0,
            bytes_received: 0,
            payload_bytes_sent: 0,
            send_failures: 0,
            receive_failures: 0,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Encapsulation overhead ratio: wire bytes per payload byte sent.
    /// Below 1.0 means compression won more than the headers cost.
    pub fn overhead_ratio(&self) -> Option<f64> {
        if self.payload_bytes_sent == 0 {
            return None;
        }
        Some(self.bytes_sent as f64 / self.payload_bytes_sent as f64)
    }

    /// Human-readable summary, printed by the harness at close.
    pub fn report(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Connection Summary ===\n");
        out.push_str(&format!(
            "Messages: {} sent, {} received\n",
            self.messages_sent, self.messages_received
        ));
        out.push_str(&format!(
            "Wire bytes: {} sent, {} received\n",
            self.bytes_sent, self.bytes_received
        ));
        if let Some(ratio) = self.overhead_ratio() {
            out.push_str(&format!(
                "Encapsulation overhead: {:.2}x ({} payload bytes)\n",
                ratio, self.payload_bytes_sent
            ));
        }
        out.push_str(&format!(
            "Failures: {} send, {} receive\n",
            self.send_failures, self.receive_failures
        ));
        out.push_str(&format!("Open for: {:.2?}\n", self.elapsed()));
        out
    }
}

impl Default for StackMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overhead_ratio() {
        let mut metrics = StackMetrics::new();
        assert!(metrics.overhead_ratio().is_none());

        metrics.payload_bytes_sent = 100;
        metrics.bytes_sent = 150;
        assert_eq!(metrics.overhead_ratio(), Some(1.5));
    }

    #[test]
    fn test_report_mentions_counts() {
        let mut metrics = StackMetrics::new();
        metrics.messages_sent = 3;
        metrics.messages_received = 2;

        let report = metrics.report();
        assert!(report.contains("3 sent"));
        assert!(report.contains("2 received"));
    }
}
