//! Point-in-time telemetry snapshot.

use std::fmt;
use std::time::Duration;

/// A point-in-time snapshot of service metrics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// How long the service has been running
    pub uptime: Duration,
    /// Positions delivered to request handlers
    pub positions_delivered: u64,
    /// Headings delivered to request handlers
    pub headings_delivered: u64,
    /// Visits delivered to request handlers
    pub visits_delivered: u64,
    /// Errors delivered to request handlers
    pub errors_delivered: u64,
    /// Location reconciliation passes
    pub reconciliations: u64,
    /// Permission prompts issued
    pub permission_requests: u64,
    /// Hardware events received
    pub hardware_events: u64,
    /// Geocoding calls that produced places
    pub geocodes_succeeded: u64,
    /// Geocoding calls that failed
    pub geocodes_failed: u64,
}

impl MetricsSnapshot {
    /// Total geocoding calls finished.
    pub fn geocodes_total(&self) -> u64 {
        self.geocodes_succeeded + self.geocodes_failed
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "up {}s: {} positions, {} headings, {} visits, {} errors, {} reconciliations, {}/{} geocodes ok",
            self.uptime.as_secs(),
            self.positions_delivered,
            self.headings_delivered,
            self.visits_delivered,
            self.errors_delivered,
            self.reconciliations,
            self.geocodes_succeeded,
            self.geocodes_total()
        )
    }
}
