//! LocationKit - Location services for many observers over one hardware session
//!
//! Any number of independent location, heading and visit requests share a
//! single location-hardware session. After every registry change the service
//! reconciles the hardware to the least restrictive configuration that
//! satisfies all active requests, gated by the user's authorization.
//!
//! # High-Level API
//!
//! The [`service`] module provides the facade:
//!
//! ```ignore
//! use locationkit::{LocationService, ServiceConfig};
//! use locationkit::hardware::event_channel;
//! use locationkit::request::LocationOptions;
//!
//! let (events, receiver) = event_channel();
//! let hardware = Arc::new(MyPlatformHardware::new(events));
//! let service = Arc::new(LocationService::new(hardware, ServiceConfig::load()?));
//! service.spawn_event_loop(receiver);
//!
//! let request = service.start_location_updates(
//!     LocationOptions::new(),
//!     |position| println!("{}", position.coordinate),
//!     |error| eprintln!("{error}"),
//! )?;
//! ```
//!
//! Geocoding lives beside the service in [`geocoder`] and shares nothing with
//! the observer registries.

pub mod authorization;
pub mod config;
pub mod error;
pub mod geocoder;
pub mod hardware;
pub mod logging;
pub mod model;
pub mod provider;
pub mod reconcile;
pub mod registry;
pub mod request;
pub mod service;
pub mod telemetry;

pub use config::{GeocoderSettings, ServiceConfig};
pub use error::{LocationError, LocationResult};
pub use geocoder::Geocoder;
pub use model::{
    Accuracy, ActivityType, AuthorizationIntent, AuthorizationStatus, Coordinate,
    DeviceOrientation, Heading, Place, Position, UpdateFrequency, Visit,
};
pub use provider::GeocodeError;
pub use service::LocationService;

/// Version of the LocationKit library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
