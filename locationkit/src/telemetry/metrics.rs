//! Lock-free atomic metrics collection.
//!
//! Uses `AtomicU64` for thread-safe metrics collection without locks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::MetricsSnapshot;

/// Lock-free metrics collection for the location service.
///
/// All operations use `Relaxed` ordering: the counters are independent
/// measurements.
#[derive(Debug)]
pub struct ServiceMetrics {
    /// When metrics collection started
    start_time: Instant,

    // === Delivery metrics ===
    /// Positions delivered to request handlers
    positions_delivered: AtomicU64,
    /// Headings delivered to request handlers
    headings_delivered: AtomicU64,
    /// Visits delivered to request handlers
    visits_delivered: AtomicU64,
    /// Errors delivered to request handlers
    errors_delivered: AtomicU64,

    // === Hardware metrics ===
    /// Location reconciliation passes
    reconciliations: AtomicU64,
    /// Permission prompts issued
    permission_requests: AtomicU64,
    /// Hardware events received
    hardware_events: AtomicU64,

    // === Geocoding metrics ===
    /// Geocoding calls that produced places
    geocodes_succeeded: AtomicU64,
    /// Geocoding calls that failed
    geocodes_failed: AtomicU64,
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Creates a new metrics instance.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            positions_delivered: AtomicU64::new(0),
            headings_delivered: AtomicU64::new(0),
            visits_delivered: AtomicU64::new(0),
            errors_delivered: AtomicU64::new(0),
            reconciliations: AtomicU64::new(0),
            permission_requests: AtomicU64::new(0),
            hardware_events: AtomicU64::new(0),
            geocodes_succeeded: AtomicU64::new(0),
            geocodes_failed: AtomicU64::new(0),
        }
    }

    /// Record a position delivered to one request.
    pub fn position_delivered(&self) {
        self.positions_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a heading delivered to one request.
    pub fn heading_delivered(&self) {
        self.headings_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a visit delivered to one request.
    pub fn visit_delivered(&self) {
        self.visits_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an error delivered to one request.
    pub fn error_delivered(&self) {
        self.errors_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a location reconciliation pass.
    pub fn reconciliation(&self) {
        self.reconciliations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a permission prompt.
    pub fn permission_requested(&self) {
        self.permission_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a hardware event.
    pub fn hardware_event(&self) {
        self.hardware_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a geocoding call outcome.
    pub fn geocode_finished(&self, succeeded: bool) {
        if succeeded {
            self.geocodes_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.geocodes_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            positions_delivered: self.positions_delivered.load(Ordering::Relaxed),
            headings_delivered: self.headings_delivered.load(Ordering::Relaxed),
            visits_delivered: self.visits_delivered.load(Ordering::Relaxed),
            errors_delivered: self.errors_delivered.load(Ordering::Relaxed),
            reconciliations: self.reconciliations.load(Ordering::Relaxed),
            permission_requests: self.permission_requests.load(Ordering::Relaxed),
            hardware_events: self.hardware_events.load(Ordering::Relaxed),
            geocodes_succeeded: self.geocodes_succeeded.load(Ordering::Relaxed),
            geocodes_failed: self.geocodes_failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let snapshot = ServiceMetrics::new().snapshot();
        assert_eq!(snapshot.positions_delivered, 0);
        assert_eq!(snapshot.errors_delivered, 0);
        assert_eq!(snapshot.geocodes_failed, 0);
    }

    #[test]
    fn test_geocode_outcomes_are_split() {
        let metrics = ServiceMetrics::new();
        metrics.geocode_finished(true);
        metrics.geocode_finished(false);
        metrics.geocode_finished(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.geocodes_succeeded, 1);
        assert_eq!(snapshot.geocodes_failed, 2);
        assert_eq!(snapshot.geocodes_total(), 3);
    }
}
