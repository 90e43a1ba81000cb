/// The session record (spec S3/S4.4): identity, lifecycle, and counters.
///
/// Smoother tail samples are deliberately absent from this struct. S9's
/// design note keeps each direction's tail owned by that direction's
/// reader task inside `relay::run` — never shared, never locked.
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;

use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lifecycle {
    Accepted = 0,
    UpstreamConnecting = 1,
    Active = 2,
    Closing = 3,
    Closed = 4,
}

impl Lifecycle {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Lifecycle::Accepted,
            1 => Lifecycle::UpstreamConnecting,
            2 => Lifecycle::Active,
            3 => Lifecycle::Closing,
            _ => Lifecycle::Closed,
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionCounters {
    pub bytes_from_client: AtomicU64,
    pub bytes_to_client: AtomicU64,
    pub conversions: AtomicU64,
}

pub struct Session {
    pub id: String,
    pub context: String,
    pub counters: SessionCounters,
    pub started_at: Instant,
    state: AtomicU8,
    closing: Notify,
}

impl Session {
    pub fn new(id: String, context: String) -> Arc<Self> {
        Arc::new(Self {
            id,
            context,
            counters: SessionCounters::default(),
            started_at: Instant::now(),
            state: AtomicU8::new(Lifecycle::Accepted as u8),
            closing: Notify::new(),
        })
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Apply a forward-only lifecycle transition (spec S4.4: "any edge
    /// other than forward transitions is rejected").
    pub fn transition(&self, to: Lifecycle) -> Result<(), BridgeError> {
        let from = self.lifecycle();
        let allowed = matches!(
            (from, to),
            (Lifecycle::Accepted, Lifecycle::UpstreamConnecting)
                | (Lifecycle::UpstreamConnecting, Lifecycle::Active)
                | (Lifecycle::Accepted, Lifecycle::Closing)
                | (Lifecycle::UpstreamConnecting, Lifecycle::Closing)
                | (Lifecycle::Active, Lifecycle::Closing)
                | (Lifecycle::Closing, Lifecycle::Closed)
        );
        if !allowed {
            return Err(BridgeError::Transform(format!(
                "rejected lifecycle transition {from:?} -> {to:?}"
            )));
        }
        self.state.store(to as u8, Ordering::Release);
        Ok(())
    }

    /// Idempotent entry into `Closing`. Only the caller that actually
    /// moved the state should tear down resources (spec "resources
    /// released exactly once").
    pub fn begin_close(&self) -> bool {
        self.transition(Lifecycle::Closing).is_ok()
    }

    pub fn finish_close(&self) {
        let _ = self.transition(Lifecycle::Closed);
        self.closing.notify_waiters();
    }

    pub async fn wait_for_close(&self) {
        self.closing.notified().await;
    }

    pub fn record_from_client(&self, bytes: usize) {
        self.counters.bytes_from_client.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_to_client(&self, bytes: usize) {
        self.counters.bytes_to_client.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_conversion(&self) {
        self.counters.conversions.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_succeed_in_order() {
        let s = Session::new("a".into(), "ctx".into());
        assert_eq!(s.lifecycle(), Lifecycle::Accepted);
        s.transition(Lifecycle::UpstreamConnecting).unwrap();
        s.transition(Lifecycle::Active).unwrap();
        s.transition(Lifecycle::Closing).unwrap();
        s.transition(Lifecycle::Closed).unwrap();
        assert_eq!(s.lifecycle(), Lifecycle::Closed);
    }

    #[test]
    fn backward_or_skipped_transitions_are_rejected() {
        let s = Session::new("b".into(), "ctx".into());
        assert!(s.transition(Lifecycle::Active).is_err());
        s.transition(Lifecycle::UpstreamConnecting).unwrap();
        assert!(s.transition(Lifecycle::Accepted).is_err());
    }

    #[test]
    fn begin_close_is_idempotent() {
        let s = Session::new("c".into(), "ctx".into());
        assert!(s.begin_close());
        assert!(!s.begin_close());
        s.finish_close();
        assert_eq!(s.lifecycle(), Lifecycle::Closed);
    }

    #[test]
    fn counters_accumulate() {
        let s = Session::new("d".into(), "ctx".into());
        s.record_from_client(160);
        s.record_to_client(3840);
        s.record_conversion();
        assert_eq!(s.counters.bytes_from_client.load(Ordering::Relaxed), 160);
        assert_eq!(s.counters.bytes_to_client.load(Ordering::Relaxed), 3840);
        assert_eq!(s.counters.conversions.load(Ordering::Relaxed), 1);
    }
}
