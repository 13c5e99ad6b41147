//! Heading update requests.

use parking_lot::Mutex;

use super::{ErrorHandler, Request, RequestFlags, RequestId, RequestKind};
use crate::error::LocationError;
use crate::model::Heading;

/// Handler invoked with each delivered heading.
pub type HeadingHandler = Box<dyn Fn(&Heading) + Send + Sync>;

/// Predicate asked whether the compass calibration prompt should be shown.
pub type CalibrationPredicate = Box<dyn Fn() -> bool + Send + Sync>;

/// A caller's interest in heading updates.
pub struct HeadingRequest {
    id: RequestId,
    filter: Option<f64>,
    flags: RequestFlags,
    on_success: HeadingHandler,
    on_error: ErrorHandler,
    calibration: Option<CalibrationPredicate>,
    last_heading: Mutex<Option<Heading>>,
}

impl HeadingRequest {
    /// Create a request with a fresh identifier.
    ///
    /// `filter` is the minimum angular change in degrees; `None` reports every
    /// change.
    pub fn new<S, E>(filter: Option<f64>, on_success: S, on_error: E) -> Self
    where
        S: Fn(&Heading) + Send + Sync + 'static,
        E: Fn(&LocationError) + Send + Sync + 'static,
    {
        Self {
            id: RequestId::next(),
            filter,
            flags: RequestFlags::new(),
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
            calibration: None,
            last_heading: Mutex::new(None),
        }
    }

    /// Attach a calibration-required predicate.
    pub fn with_calibration<P>(mut self, predicate: P) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.calibration = Some(Box::new(predicate));
        self
    }

    /// Minimum angular change in degrees, if set.
    pub fn filter(&self) -> Option<f64> {
        self.filter
    }

    /// Last heading delivered to this request.
    pub fn last_heading(&self) -> Option<Heading> {
        self.last_heading.lock().clone()
    }

    /// Returns true if this request's predicate asks for calibration.
    /// Requests without a predicate never do.
    pub fn needs_calibration(&self) -> bool {
        self.calibration.as_ref().is_some_and(|predicate| predicate())
    }

    /// Deliver a result to the owner's handlers. An error terminates the
    /// request.
    pub fn receive(&self, result: Result<&Heading, &LocationError>) -> bool {
        match result {
            Ok(heading) => self.deliver(heading),
            Err(error) => self.fail(error),
        }
    }

    pub(crate) fn deliver(&self, heading: &Heading) -> bool {
        if self.flags.is_terminated() {
            return false;
        }
        *self.last_heading.lock() = Some(heading.clone());
        (self.on_success)(heading);
        true
    }

    pub(crate) fn fail(&self, error: &LocationError) -> bool {
        if !self.flags.terminate() {
            return false;
        }
        (self.on_error)(error);
        true
    }
}

impl Request for HeadingRequest {
    const KIND: RequestKind = RequestKind::Heading;

    fn id(&self) -> RequestId {
        self.id
    }

    fn flags(&self) -> &RequestFlags {
        &self.flags
    }
}

impl std::fmt::Debug for HeadingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadingRequest")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_predicate() {
        let plain = HeadingRequest::new(None, |_| {}, |_| {});
        assert!(!plain.needs_calibration());

        let wants = HeadingRequest::new(Some(5.0), |_| {}, |_| {}).with_calibration(|| true);
        assert!(wants.needs_calibration());
    }

    #[test]
    fn test_deliver_caches_last_heading() {
        let request = HeadingRequest::new(Some(2.0), |_| {}, |_| {});
        let heading = Heading::new(271.0, 3.0).with_true_heading(273.5);

        assert!(request.receive(Ok(&heading)));
        assert_eq!(request.last_heading(), Some(heading));
        assert_eq!(request.filter(), Some(2.0));
    }

    #[test]
    fn test_error_is_delivered_once() {
        let request = HeadingRequest::new(None, |_| {}, |_| {});
        let error = LocationError::MissingAuthorizationDeclaration;

        assert!(request.receive(Err(&error)));
        assert!(!request.receive(Err(&error)));
        assert!(!request.receive(Ok(&Heading::new(10.0, 1.0))));
    }
}
