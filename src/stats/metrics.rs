//! Statistics and metrics for the hub

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Hub-wide counters
///
/// Updated lock-free from receive loops and broadcasts.
#[derive(Debug)]
pub struct HubStats {
    started_at: Instant,
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    messages_received: AtomicU64,
    messages_injected: AtomicU64,
    deliveries: AtomicU64,
    delivery_failures: AtomicU64,
}

impl HubStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_injected: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
        }
    }

    pub(crate) fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn message_injected(&self) {
        self.messages_injected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self, delivered: usize, failed: usize) {
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.delivery_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    /// Number of connections currently attached
    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Copy the current counter values
    pub fn snapshot(&self, active_groups: usize) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            active_groups: active_groups as u64,
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_injected: self.messages_injected.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for HubStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`HubStats`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSnapshot {
    /// Time since the hub was created
    #[serde(serialize_with = "serialize_secs")]
    pub uptime: Duration,
    /// Total connections ever attached
    pub total_connections: u64,
    /// Connections currently attached
    pub active_connections: u64,
    /// Groups with at least one member
    pub active_groups: u64,
    /// Messages read from member connections
    pub messages_received: u64,
    /// Messages injected from outside
    pub messages_injected: u64,
    /// Successful per-member deliveries
    pub deliveries: u64,
    /// Failed per-member deliveries
    pub delivery_failures: u64,
}

impl StatsSnapshot {
    /// Fraction of delivery attempts that failed
    pub fn failure_ratio(&self) -> f64 {
        let attempts = self.deliveries + self.delivery_failures;
        if attempts > 0 {
            self.delivery_failures as f64 / attempts as f64
        } else {
            0.0
        }
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_stats_new() {
        let stats = HubStats::new();
        let snap = stats.snapshot(0);
        assert_eq!(snap.total_connections, 0);
        assert_eq!(snap.active_connections, 0);
        assert_eq!(snap.deliveries, 0);
        assert_eq!(snap.delivery_failures, 0);
    }

    #[test]
    fn test_connection_counters() {
        let stats = HubStats::new();
        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();

        let snap = stats.snapshot(1);
        assert_eq!(snap.total_connections, 2);
        assert_eq!(snap.active_connections, 1);
        assert_eq!(snap.active_groups, 1);
    }

    #[test]
    fn test_failure_ratio() {
        let stats = HubStats::new();
        stats.record_broadcast(3, 1);

        let snap = stats.snapshot(0);
        assert_eq!(snap.deliveries, 3);
        assert_eq!(snap.delivery_failures, 1);
        assert!((snap.failure_ratio() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failure_ratio_no_attempts() {
        assert_eq!(StatsSnapshot::default().failure_ratio(), 0.0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = HubStats::new();
        stats.message_injected();

        let json = serde_json::to_value(stats.snapshot(0)).unwrap();
        assert_eq!(json["messages_injected"], 1);
        assert!(json["uptime"].is_u64());
    }
}
