//! Observer requests.
//!
//! A request is one caller's registered interest in one class of
//! location-service event. It carries its own configuration, its handlers and
//! its enabled/paused state. Requests are shared (`Arc`) between the caller
//! and the registry.
//!
//! - [`LocationRequest`] - continuous, one-shot or significant-change positions
//! - [`HeadingRequest`] - compass headings
//! - [`VisitRequest`] - visit notifications
//!
//! Delivering an error terminates a request: it stops accepting further
//! results and the service removes it from its registry.

mod heading;
mod location;
mod visit;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub use heading::{CalibrationPredicate, HeadingHandler, HeadingRequest};
pub use location::{LocationOptions, LocationRequest, PauseHandler, PositionHandler};
pub use visit::{VisitHandler, VisitRequest};

use crate::error::LocationError;

/// Handler invoked with the error that terminated a request.
pub type ErrorHandler = Box<dyn Fn(&LocationError) + Send + Sync>;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique request identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocate a fresh identifier.
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// The three request variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Position updates.
    Location,
    /// Heading updates.
    Heading,
    /// Visit notifications.
    Visit,
}

/// Lifecycle flags shared by every request variant.
///
/// A request takes part in reconciliation and receives events only while it
/// is active: enabled, not paused, not terminated.
#[derive(Debug)]
pub struct RequestFlags {
    enabled: AtomicBool,
    paused: AtomicBool,
    terminated: AtomicBool,
}

impl RequestFlags {
    fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.is_enabled() && !self.is_paused() && !self.is_terminated()
    }

    /// Mark terminated. Returns true only for the first call.
    fn terminate(&self) -> bool {
        self.enabled.store(false, Ordering::SeqCst);
        !self.terminated.swap(true, Ordering::SeqCst)
    }
}

/// Behavior common to all request variants.
pub trait Request: Send + Sync {
    /// Whether the registry force-enables the request when adding it.
    const ENABLE_ON_REGISTER: bool = false;

    /// Which registry this request belongs to.
    const KIND: RequestKind;

    /// Unique identifier.
    fn id(&self) -> RequestId;

    /// Lifecycle flags.
    fn flags(&self) -> &RequestFlags;

    /// Enable the request.
    fn enable(&self) {
        self.flags().enable();
    }

    /// Disable the request. It stays registered but stops influencing the
    /// hardware configuration.
    fn disable(&self) {
        self.flags().disable();
    }

    /// Pause the request.
    fn pause(&self) {
        self.flags().pause();
    }

    /// Resume a paused request.
    fn resume(&self) {
        self.flags().resume();
    }

    /// Returns true if the request takes part in reconciliation and delivery.
    fn is_active(&self) -> bool {
        self.flags().is_active()
    }

    /// Returns true once an error has been delivered.
    fn is_terminated(&self) -> bool {
        self.flags().is_terminated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestId::next();
        let b = RequestId::next();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("req-"));
    }

    #[test]
    fn test_flags_lifecycle() {
        let flags = RequestFlags::new();
        assert!(flags.is_active());

        flags.pause();
        assert!(!flags.is_active());
        flags.resume();
        assert!(flags.is_active());

        flags.disable();
        assert!(!flags.is_active());
        flags.enable();

        assert!(flags.terminate());
        assert!(!flags.terminate(), "second terminate must report false");
        assert!(!flags.is_active());
        assert!(flags.is_terminated());
    }
}
