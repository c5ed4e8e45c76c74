//! Heartbeat controller
//!
//! Sends op 1 carrying the last sequence number at a fixed rate. A missing
//! acknowledgement is only logged: the heartbeat still goes out and the
//! server decides when the connection is dead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::protocol::GatewayMessage;
use crate::transport::GatewaySender;

/// Last sequence number seen on the current session
pub type SharedSequence = Arc<Mutex<Option<u64>>>;

#[derive(Default)]
pub struct HeartbeatController {
    acked: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start beating every `period`, the first beat immediately.
    ///
    /// Replaces a running heartbeat.
    pub fn start(&self, period: Duration, sender: GatewaySender, sequence: SharedSequence) {
        self.acked.store(true, Ordering::SeqCst);
        let acked = self.acked.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !acked.swap(false, Ordering::SeqCst) {
                    tracing::warn!("Last heartbeat was not acknowledged");
                }
                let last_sequence = *sequence.lock();
                match sender.send(&GatewayMessage::heartbeat(last_sequence)) {
                    Ok(()) => tracing::trace!(?last_sequence, "Heartbeat sent"),
                    Err(e) => tracing::debug!(error = %e, "Heartbeat not sent"),
                }
            }
        });

        if let Some(previous) = self.task.lock().replace(task) {
            previous.abort();
        }
        tracing::debug!(interval_ms = period.as_millis(), "Heartbeat started");
    }

    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            tracing::debug!("Heartbeat stopped");
        }
    }

    /// Record a heartbeat acknowledgement
    pub fn ack(&self) {
        self.acked.store(true, Ordering::SeqCst);
    }

    pub fn is_acked(&self) -> bool {
        self.acked.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for HeartbeatController {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::OutboundFrame;

    fn sent_sequence(frame: OutboundFrame) -> serde_json::Value {
        match frame {
            OutboundFrame::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value["op"], 1);
                value["d"].clone()
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_beats_at_fixed_rate() {
        let sender = GatewaySender::new();
        let mut outbound = sender.attach();
        let sequence: SharedSequence = Arc::new(Mutex::new(Some(7)));
        let heartbeat = HeartbeatController::new();

        heartbeat.start(Duration::from_millis(1000), sender, sequence.clone());

        // first beat is immediate
        let first = outbound.recv().await.unwrap();
        assert_eq!(sent_sequence(first), 7);
        heartbeat.ack();

        *sequence.lock() = Some(9);
        tokio::time::advance(Duration::from_millis(1000)).await;
        let second = outbound.recv().await.unwrap();
        assert_eq!(sent_sequence(second), 9);

        heartbeat.stop();
        assert!(!heartbeat.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_ack_still_beats() {
        let sender = GatewaySender::new();
        let mut outbound = sender.attach();
        let heartbeat = HeartbeatController::new();

        heartbeat.start(Duration::from_millis(500), sender, Arc::new(Mutex::new(None)));
        assert_eq!(sent_sequence(outbound.recv().await.unwrap()), serde_json::Value::Null);
        assert!(!heartbeat.is_acked());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(outbound.recv().await.is_some());
    }
}
