//! Service telemetry for observability.
//!
//! Lock-free atomic counters record what the service delivers and how often it
//! reconfigures the hardware, with minimal overhead on the dispatch path.
//!
//! # Architecture
//!
//! ```text
//! Service / Geocoder ─────► ServiceMetrics ─────► MetricsSnapshot ─────► Views
//!                          (atomic counters)     (point-in-time copy)    (logs, etc.)
//! ```
//!
//! # Example
//!
//! ```
//! use locationkit::telemetry::ServiceMetrics;
//!
//! let metrics = ServiceMetrics::new();
//! metrics.position_delivered();
//! metrics.reconciliation();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.positions_delivered, 1);
//! assert_eq!(snapshot.reconciliations, 1);
//! ```

mod metrics;
mod snapshot;

pub use metrics::ServiceMetrics;
pub use snapshot::MetricsSnapshot;
