//! Error types for the observer side of the service.
//!
//! Geocoding failures are a separate concern and live in
//! [`crate::provider::GeocodeError`]; they never touch registry state.

use thiserror::Error;

use crate::hardware::HardwareError;
use crate::model::AuthorizationStatus;
use crate::request::RequestId;

/// Result type for service operations.
pub type LocationResult<T> = Result<T, LocationError>;

/// Errors delivered to request handlers or returned by the service.
///
/// `Clone` because a single hardware or authorization failure is broadcast to
/// every affected request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    /// The application declared no authorization intent, so permission can
    /// never be requested. Fatal configuration error.
    #[error("No location usage intent declared; cannot request authorization")]
    MissingAuthorizationDeclaration,

    /// Authorization was denied, restricted, or revoked. The request is
    /// terminated and must be registered again after access is granted.
    #[error("Location authorization refused ({0})")]
    AuthorizationDenied(AuthorizationStatus),

    /// The hardware reported a failure. Every active location request is
    /// terminated.
    #[error("Location hardware failure: {0}")]
    HardwareFailure(#[from] HardwareError),

    /// No registered request has this identifier.
    #[error("Unknown request: {0}")]
    UnknownRequest(RequestId),
}

impl LocationError {
    /// Returns true if the error ends the request it is delivered to.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LocationError::UnknownRequest(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = LocationError::AuthorizationDenied(AuthorizationStatus::Denied);
        assert!(err.to_string().contains("denied"));

        let err = LocationError::MissingAuthorizationDeclaration;
        assert!(err.to_string().contains("intent"));
    }

    #[test]
    fn test_from_hardware_error() {
        let hw = HardwareError::new(1, "location unknown");
        let err: LocationError = hw.clone().into();
        assert_eq!(err, LocationError::HardwareFailure(hw));
        assert!(err.to_string().contains("location unknown"));
    }

    #[test]
    fn test_terminal_errors() {
        assert!(LocationError::MissingAuthorizationDeclaration.is_terminal());
        assert!(!LocationError::UnknownRequest(RequestId::next()).is_terminal());
    }
}
