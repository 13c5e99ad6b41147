//! Geocoding provider types and traits

use std::future::Future;

use thiserror::Error;

use crate::model::{Coordinate, Place};

/// Errors that can occur during geocoding.
///
/// Provider-reported messages are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    /// The provider answered but produced zero usable results
    #[error("No data returned")]
    NoDataReturned,
    /// The provider's usage quota is exhausted
    #[error("Provider quota exceeded: {0}")]
    QuotaExceeded(String),
    /// The provider refused the request (bad or missing credentials)
    #[error("Request denied: {0}")]
    RequestDenied(String),
    /// The request was malformed (empty address, invalid coordinate)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    HttpError(String),
    /// Invalid response data from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Provider-specific error
    #[error("Provider error: {0}")]
    ProviderSpecific(String),
}

/// Trait for forward and reverse geocoding back ends.
///
/// Each call owns its own request/response lifecycle. Calls share no state
/// and do not cancel one another.
pub trait GeocodingProvider: Send + Sync {
    /// Resolves a free-form address to candidate places, best match first.
    fn geocode_address(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Vec<Place>, GeocodeError>> + Send;

    /// Resolves a coordinate to candidate places, closest match first.
    fn reverse_geocode(
        &self,
        coordinate: Coordinate,
    ) -> impl Future<Output = Result<Vec<Place>, GeocodeError>> + Send;

    /// Returns the human-readable name of this provider.
    fn name(&self) -> &str;
}

/// Trait for coarse IP-based location lookup.
pub trait IpLocationProvider: Send + Sync {
    /// Locates the caller's public IP address. Never retried.
    fn lookup(&self) -> impl Future<Output = Result<Place, GeocodeError>> + Send;

    /// Returns the human-readable name of this provider.
    fn name(&self) -> &str;
}

/// Rejects coordinates no provider can resolve.
pub(crate) fn validate_coordinate(coordinate: Coordinate) -> Result<(), GeocodeError> {
    if coordinate.is_valid() {
        Ok(())
    } else {
        Err(GeocodeError::InvalidRequest(format!(
            "coordinate out of range: {}",
            coordinate
        )))
    }
}

/// Rejects blank addresses.
pub(crate) fn validate_address(address: &str) -> Result<&str, GeocodeError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        Err(GeocodeError::InvalidRequest("empty address".to_string()))
    } else {
        Ok(trimmed)
    }
}
