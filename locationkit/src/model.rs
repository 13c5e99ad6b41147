//! Core value types for location services.
//!
//! These types are shared by observer requests, the hardware capability and the
//! geocoding providers:
//!
//! - [`Coordinate`], [`Position`], [`Heading`], [`Visit`], [`Place`] - data values
//! - [`Accuracy`], [`UpdateFrequency`], [`ActivityType`] - ordered request axes
//! - [`AuthorizationStatus`], [`AuthorizationIntent`], [`PermissionLevel`] - permission state
//! - [`DeviceOrientation`], [`HeadingFilter`] - heading configuration
//!
//! # Ordering
//!
//! The request axes derive `Ord` from their declaration order. Reconciliation
//! relies on it:
//!
//! - `Accuracy` runs coarse → precise, so the finest requirement is the maximum
//! - `UpdateFrequency` runs most → least frequent, so the aggregate is the minimum
//! - `ActivityType` runs low → high power, so the aggregate is the maximum

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns true if both components are finite and within WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// A position fix reported by the hardware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Where the fix was taken.
    pub coordinate: Coordinate,
    /// Altitude above sea level in meters, if known.
    pub altitude: Option<f64>,
    /// Radius of uncertainty in meters.
    pub horizontal_accuracy: f64,
    /// Altitude uncertainty in meters, if known.
    pub vertical_accuracy: Option<f64>,
    /// Ground speed in meters per second, if known.
    pub speed: Option<f64>,
    /// Course over ground in degrees from true north, if known.
    pub course: Option<f64>,
    /// When the fix was taken.
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// Create a fix taken now.
    pub fn new(coordinate: Coordinate, horizontal_accuracy: f64) -> Self {
        Self::at(coordinate, horizontal_accuracy, Utc::now())
    }

    /// Create a fix with an explicit timestamp.
    pub fn at(coordinate: Coordinate, horizontal_accuracy: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            coordinate,
            altitude: None,
            horizontal_accuracy,
            vertical_accuracy: None,
            speed: None,
            course: None,
            timestamp,
        }
    }

    /// Set the altitude and its uncertainty.
    pub fn with_altitude(mut self, altitude: f64, vertical_accuracy: f64) -> Self {
        self.altitude = Some(altitude);
        self.vertical_accuracy = Some(vertical_accuracy);
        self
    }

    /// Set speed and course.
    pub fn with_motion(mut self, speed: f64, course: f64) -> Self {
        self.speed = Some(speed);
        self.course = Some(course);
        self
    }
}

/// A compass heading reported by the hardware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    /// Heading relative to magnetic north, degrees.
    pub magnetic: f64,
    /// Heading relative to true north, degrees. Absent without a position fix.
    pub true_heading: Option<f64>,
    /// Maximum deviation in degrees. Negative means invalid.
    pub accuracy: f64,
    /// When the heading was measured.
    pub timestamp: DateTime<Utc>,
}

impl Heading {
    /// Create a heading measured now.
    pub fn new(magnetic: f64, accuracy: f64) -> Self {
        Self {
            magnetic,
            true_heading: None,
            accuracy,
            timestamp: Utc::now(),
        }
    }

    /// Set the true-north heading.
    pub fn with_true_heading(mut self, true_heading: f64) -> Self {
        self.true_heading = Some(true_heading);
        self
    }
}

/// A dwell at a place detected by the hardware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    /// Center of the visited place.
    pub coordinate: Coordinate,
    /// Radius of uncertainty in meters.
    pub horizontal_accuracy: f64,
    /// Arrival time, if observed.
    pub arrival: Option<DateTime<Utc>>,
    /// Departure time, absent while the visit is still ongoing.
    pub departure: Option<DateTime<Utc>>,
}

impl Visit {
    /// Create a visit with no arrival or departure information.
    pub fn new(coordinate: Coordinate, horizontal_accuracy: f64) -> Self {
        Self {
            coordinate,
            horizontal_accuracy,
            arrival: None,
            departure: None,
        }
    }

    /// Returns true if the device has not left the place yet.
    pub fn is_ongoing(&self) -> bool {
        self.departure.is_none()
    }
}

/// A place returned by a geocoding provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Place {
    /// Representative coordinate of the place.
    pub coordinate: Coordinate,
    /// Name of the place (point of interest, building), if any.
    pub name: Option<String>,
    /// Street address (house number and street).
    pub thoroughfare: Option<String>,
    /// City or town.
    pub locality: Option<String>,
    /// State or province.
    pub administrative_area: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
    /// Country name.
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    pub iso_country_code: Option<String>,
    /// Full address as formatted by the provider.
    pub formatted_address: Option<String>,
}

impl Place {
    /// Create a place at the given coordinate with no address data.
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            ..Default::default()
        }
    }
}

/// Requested accuracy level, ordered coarse → precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Accuracy {
    /// Any fix is acceptable.
    Any,
    /// Country-level (~100 km).
    Country,
    /// City-level (~5 km).
    City,
    /// Neighborhood-level (~1 km).
    Neighborhood,
    /// Block-level (~100 m).
    Block,
    /// House-level (~15 m).
    House,
    /// Room-level (~5 m).
    Room,
    /// Best available, for turn-by-turn navigation.
    Navigation,
}

impl Accuracy {
    /// Desired horizontal accuracy in meters handed to the hardware.
    pub fn meters(&self) -> f64 {
        match self {
            Accuracy::Any => f64::MAX,
            Accuracy::Country => 100_000.0,
            Accuracy::City => 5_000.0,
            Accuracy::Neighborhood => 1_000.0,
            Accuracy::Block => 100.0,
            Accuracy::House => 15.0,
            Accuracy::Room => 5.0,
            Accuracy::Navigation => 1.0,
        }
    }
}

/// Requested update cadence, ordered most → least frequent.
///
/// `Significant` is the weakest choice: the hardware only runs in
/// significant-change mode when every enabled request asks for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UpdateFrequency {
    /// Every fix the hardware produces.
    Continuous,
    /// A single fix, after which the request completes.
    OneShot,
    /// Only materially significant position changes (low power).
    Significant,
}

/// Activity hint used by the hardware for power tuning, ordered low → high power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    /// Unspecified activity.
    Other,
    /// Walking, running, cycling.
    Fitness,
    /// Non-automotive navigation (boats, trains).
    OtherNavigation,
    /// In-car navigation.
    AutomotiveNavigation,
}

/// Current permission state as reported by the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    #[default]
    NotDetermined,
    /// Location services are restricted by policy.
    Restricted,
    /// The user refused access.
    Denied,
    /// Access granted while the app is in use.
    AuthorizedWhenInUse,
    /// Access granted at all times.
    AuthorizedAlways,
}

impl AuthorizationStatus {
    /// Returns true for either granted status.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::AuthorizedWhenInUse | Self::AuthorizedAlways)
    }

    /// Returns true for denied or restricted.
    pub fn is_refused(&self) -> bool {
        matches!(self, Self::Denied | Self::Restricted)
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDetermined => write!(f, "not determined"),
            Self::Restricted => write!(f, "restricted"),
            Self::Denied => write!(f, "denied"),
            Self::AuthorizedWhenInUse => write!(f, "authorized when in use"),
            Self::AuthorizedAlways => write!(f, "authorized always"),
        }
    }
}

/// Authorization level the application declares it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AuthorizationIntent {
    /// No usage description declared. Requesting permission is a configuration error.
    #[default]
    None,
    /// Foreground-only access.
    WhenInUse,
    /// Background access.
    Always,
}

/// Permission level passed to the hardware when prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionLevel {
    /// Foreground-only access.
    WhenInUse,
    /// Background access.
    Always,
}

/// Physical device orientation used to reference heading values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceOrientation {
    /// Orientation unknown.
    Unknown,
    /// Upright, home button at the bottom.
    #[default]
    Portrait,
    /// Upside down.
    PortraitUpsideDown,
    /// Rotated left.
    LandscapeLeft,
    /// Rotated right.
    LandscapeRight,
    /// Flat, screen up.
    FaceUp,
    /// Flat, screen down.
    FaceDown,
}

/// Minimum angular change reported by heading updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HeadingFilter {
    /// Report every change.
    All,
    /// Report only changes of at least this many degrees.
    Degrees(f64),
}

impl HeadingFilter {
    /// Filter value in degrees; `All` is zero.
    pub fn degrees(&self) -> f64 {
        match self {
            HeadingFilter::All => 0.0,
            HeadingFilter::Degrees(d) => *d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_orders_coarse_to_precise() {
        assert!(Accuracy::Any < Accuracy::City);
        assert!(Accuracy::City < Accuracy::Block);
        assert!(Accuracy::Room < Accuracy::Navigation);
        assert!(Accuracy::Navigation.meters() < Accuracy::City.meters());
    }

    #[test]
    fn test_frequency_significant_is_weakest() {
        assert!(UpdateFrequency::Continuous < UpdateFrequency::OneShot);
        assert!(UpdateFrequency::OneShot < UpdateFrequency::Significant);
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinate::new(53.55, 9.99).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_authorization_status_predicates() {
        assert!(AuthorizationStatus::AuthorizedAlways.is_granted());
        assert!(AuthorizationStatus::Restricted.is_refused());
        assert!(!AuthorizationStatus::NotDetermined.is_granted());
        assert!(!AuthorizationStatus::NotDetermined.is_refused());
    }

    #[test]
    fn test_heading_filter_degrees() {
        assert_eq!(HeadingFilter::All.degrees(), 0.0);
        assert_eq!(HeadingFilter::Degrees(5.0).degrees(), 5.0);
    }

    #[test]
    fn test_visit_ongoing() {
        let mut visit = Visit::new(Coordinate::new(1.0, 2.0), 50.0);
        assert!(visit.is_ongoing());
        visit.departure = Some(Utc::now());
        assert!(!visit.is_ongoing());
    }
}
