//! Position update requests.

use parking_lot::Mutex;

use super::{ErrorHandler, Request, RequestFlags, RequestId, RequestKind};
use crate::error::LocationError;
use crate::model::{Accuracy, ActivityType, Position, UpdateFrequency};

/// Handler invoked with each delivered position.
pub type PositionHandler = Box<dyn Fn(&Position) + Send + Sync>;

/// Handler invoked when the hardware pauses updates, with the last position
/// this request received.
pub type PauseHandler = Box<dyn Fn(Option<&Position>) + Send + Sync>;

/// Hardware requirements of a single location request.
///
/// Unset axes do not take part in reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocationOptions {
    /// Required accuracy.
    pub accuracy: Option<Accuracy>,
    /// Required update cadence.
    pub frequency: Option<UpdateFrequency>,
    /// Activity hint for power tuning.
    pub activity: Option<ActivityType>,
    /// Minimum movement in meters between updates. Unset means every movement.
    pub distance_filter: Option<f64>,
}

impl LocationOptions {
    /// Options with every axis unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the required accuracy.
    pub fn with_accuracy(mut self, accuracy: Accuracy) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Set the update cadence.
    pub fn with_frequency(mut self, frequency: UpdateFrequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// Set the activity hint.
    pub fn with_activity(mut self, activity: ActivityType) -> Self {
        self.activity = Some(activity);
        self
    }

    /// Set the distance filter in meters.
    pub fn with_distance_filter(mut self, meters: f64) -> Self {
        self.distance_filter = Some(meters);
        self
    }

    /// Returns true if the request completes after its first position.
    pub fn is_one_shot(&self) -> bool {
        self.frequency == Some(UpdateFrequency::OneShot)
    }
}

/// A caller's interest in position updates.
///
/// # Example
///
/// ```
/// use locationkit::model::{Accuracy, UpdateFrequency};
/// use locationkit::request::{LocationOptions, LocationRequest};
///
/// let request = LocationRequest::new(
///     LocationOptions::new()
///         .with_accuracy(Accuracy::House)
///         .with_frequency(UpdateFrequency::Continuous),
///     |position| println!("at {}", position.coordinate),
///     |error| eprintln!("stopped: {}", error),
/// )
/// .on_pause(|last| println!("paused, last fix {:?}", last));
/// assert!(request.last_position().is_none());
/// ```
pub struct LocationRequest {
    id: RequestId,
    options: LocationOptions,
    flags: RequestFlags,
    on_success: PositionHandler,
    on_error: ErrorHandler,
    on_pause: Option<PauseHandler>,
    last_position: Mutex<Option<Position>>,
}

impl LocationRequest {
    /// Create a request with a fresh identifier.
    pub fn new<S, E>(options: LocationOptions, on_success: S, on_error: E) -> Self
    where
        S: Fn(&Position) + Send + Sync + 'static,
        E: Fn(&LocationError) + Send + Sync + 'static,
    {
        Self {
            id: RequestId::next(),
            options,
            flags: RequestFlags::new(),
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
            on_pause: None,
            last_position: Mutex::new(None),
        }
    }

    /// Attach a pause-notification handler.
    pub fn on_pause<P>(mut self, handler: P) -> Self
    where
        P: Fn(Option<&Position>) + Send + Sync + 'static,
    {
        self.on_pause = Some(Box::new(handler));
        self
    }

    /// The request's hardware requirements.
    pub fn options(&self) -> &LocationOptions {
        &self.options
    }

    /// Last position delivered to this request.
    pub fn last_position(&self) -> Option<Position> {
        self.last_position.lock().clone()
    }

    /// Deliver a result to the owner's handlers.
    ///
    /// Returns false if the request was already terminated and nothing was
    /// delivered. An error terminates the request.
    pub fn receive(&self, result: Result<&Position, &LocationError>) -> bool {
        match result {
            Ok(position) => self.deliver(position),
            Err(error) => self.fail(error),
        }
    }

    pub(crate) fn deliver(&self, position: &Position) -> bool {
        if self.flags.is_terminated() {
            return false;
        }
        *self.last_position.lock() = Some(position.clone());
        (self.on_success)(position);
        true
    }

    pub(crate) fn fail(&self, error: &LocationError) -> bool {
        if !self.flags.terminate() {
            return false;
        }
        (self.on_error)(error);
        true
    }

    pub(crate) fn notify_paused(&self) {
        if let Some(handler) = &self.on_pause {
            let last = self.last_position();
            handler(last.as_ref());
        }
    }
}

impl Request for LocationRequest {
    const KIND: RequestKind = RequestKind::Location;

    fn id(&self) -> RequestId {
        self.id
    }

    fn flags(&self) -> &RequestFlags {
        &self.flags
    }
}

impl std::fmt::Debug for LocationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationRequest")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
