use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Lock-free aggregate counters across all sessions (spec S4.7). Each
/// `Session` keeps its own counters too (spec S3); those roll into these
/// atomics on close rather than being tracked here directly.
#[derive(Debug)]
pub struct Stats {
    pub sessions_active: AtomicU64,
    pub sessions_total: AtomicU64,
    pub bytes_from_client: AtomicU64,
    pub bytes_to_client: AtomicU64,
    pub conversions: AtomicU64,
    pub peer_errors: AtomicU64,
}

impl Stats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions_active: AtomicU64::new(0),
            sessions_total: AtomicU64::new(0),
            bytes_from_client: AtomicU64::new(0),
            bytes_to_client: AtomicU64::new(0),
            conversions: AtomicU64::new(0),
            peer_errors: AtomicU64::new(0),
        })
    }

    #[inline(always)]
    pub fn record_session_started(&self) {
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
        self.sessions_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_session_ended(&self, bytes_from_client: u64, bytes_to_client: u64, conversions: u64) {
        self.sessions_active.fetch_sub(1, Ordering::Relaxed);
        self.bytes_from_client.fetch_add(bytes_from_client, Ordering::Relaxed);
        self.bytes_to_client.fetch_add(bytes_to_client, Ordering::Relaxed);
        self.conversions.fetch_add(conversions, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_peer_error(&self) {
        self.peer_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot current totals. Unlike the teacher's per-interval counters,
    /// session/byte/conversion totals are cumulative for the process
    /// lifetime (spec S4.7 "aggregate statistics"); only rates are
    /// interval-scoped.
    pub fn snapshot(&self, elapsed: Duration) -> StatsSnapshot {
        let secs = elapsed.as_secs_f64().max(0.001);
        let bytes_from_client = self.bytes_from_client.load(Ordering::Relaxed);
        let bytes_to_client = self.bytes_to_client.load(Ordering::Relaxed);

        StatsSnapshot {
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
            sessions_total: self.sessions_total.load(Ordering::Relaxed),
            bytes_from_client,
            bytes_to_client,
            conversions: self.conversions.load(Ordering::Relaxed),
            peer_errors: self.peer_errors.load(Ordering::Relaxed),
            throughput_mbps: ((bytes_from_client + bytes_to_client) as f64 * 8.0) / (secs * 1_000_000.0),
        }
    }
}

#[derive(Debug)]
pub struct StatsSnapshot {
    pub sessions_active: u64,
    pub sessions_total: u64,
    pub bytes_from_client: u64,
    pub bytes_to_client: u64,
    pub conversions: u64,
    pub peer_errors: u64,
    pub throughput_mbps: f64,
}

/// Background stats reporter task (spec S4.7: every 30s while any session
/// is active, plus a final report on shutdown — the final report is left
/// to the caller via `report_once`).
pub async fn stats_reporter(stats: Arc<Stats>, interval_secs: u64) {
    if interval_secs == 0 {
        std::future::pending::<()>().await;
        return;
    }

    let interval = Duration::from_secs(interval_secs);
    let start = Instant::now();

    loop {
        tokio::time::sleep(interval).await;
        if stats.sessions_active.load(Ordering::Relaxed) == 0 {
            continue;
        }
        report_once(&stats, start.elapsed());
    }
}

pub fn report_once(stats: &Stats, elapsed: Duration) {
    let snap = stats.snapshot(elapsed);
    info!(
        sessions_active = snap.sessions_active,
        sessions_total = snap.sessions_total,
        bytes_from_client = snap.bytes_from_client,
        bytes_to_client = snap.bytes_to_client,
        conversions = snap.conversions,
        peer_errors = snap.peer_errors,
        throughput_mbps = format!("{:.3}", snap.throughput_mbps),
        "stats"
    );
}
