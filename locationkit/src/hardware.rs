//! Abstraction over the device positioning hardware.
//!
//! The service owns exactly one [`LocationHardware`] and is the only component
//! that starts or stops it. Hardware implementations report back through a
//! [`HardwareEventSender`]; they must never call into the service directly,
//! since the service may be holding its state lock while it configures them.
//!
//! ```text
//! LocationService ──configure──► LocationHardware
//!        ▲                              │
//!        └──── HardwareEventReceiver ◄──┘ (HardwareEvent over mpsc)
//! ```

use thiserror::Error;
use tokio::sync::mpsc;

use crate::model::{
    AuthorizationStatus, DeviceOrientation, Heading, HeadingFilter, PermissionLevel, Position,
    Visit,
};
use crate::reconcile::LocationConfig;

/// Error reported by the hardware capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("hardware error {code}: {message}")]
pub struct HardwareError {
    /// Platform error code.
    pub code: i64,
    /// Human-readable description.
    pub message: String,
}

impl HardwareError {
    /// Create a new hardware error.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Events emitted by the hardware capability.
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareEvent {
    /// A batch of position fixes, not necessarily in timestamp order.
    PositionsUpdated(Vec<Position>),
    /// Position updates failed.
    PositionFailed(HardwareError),
    /// The hardware paused position updates on its own.
    Paused,
    /// A new heading is available.
    HeadingUpdated(Heading),
    /// A visit was recorded.
    VisitRecorded(Visit),
    /// The user or the system changed the authorization status.
    AuthorizationChanged(AuthorizationStatus),
}

/// Sending half of the hardware event channel, handed to the hardware.
pub type HardwareEventSender = mpsc::UnboundedSender<HardwareEvent>;

/// Receiving half of the hardware event channel, consumed by the service.
pub type HardwareEventReceiver = mpsc::UnboundedReceiver<HardwareEvent>;

/// Create the channel hardware events flow through.
pub fn event_channel() -> (HardwareEventSender, HardwareEventReceiver) {
    mpsc::unbounded_channel()
}

/// The device positioning capability.
///
/// Start and stop calls are idempotent from the service's point of view: the
/// service may stop a mode that is not running.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the service shares them across the
/// event loop task and caller threads.
pub trait LocationHardware: Send + Sync {
    /// Current authorization status.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Prompt the user for permission. The answer arrives later as
    /// [`HardwareEvent::AuthorizationChanged`].
    fn request_permission(&self, level: PermissionLevel) -> Result<(), HardwareError>;

    /// Allow or forbid delivery while the app is in the background.
    fn set_background_updates(&self, enabled: bool);

    /// Start (or reconfigure) continuous position updates.
    fn start_updates(&self, config: &LocationConfig);

    /// Stop continuous position updates.
    fn stop_updates(&self);

    /// Start significant-change monitoring.
    fn start_significant_changes(&self);

    /// Stop significant-change monitoring.
    fn stop_significant_changes(&self);

    /// Start (or reconfigure) heading updates.
    fn start_heading(&self, filter: HeadingFilter, orientation: DeviceOrientation);

    /// Stop heading updates.
    fn stop_heading(&self);

    /// Start visit monitoring.
    fn start_visit_monitoring(&self);

    /// Stop visit monitoring.
    fn stop_visit_monitoring(&self);
}
