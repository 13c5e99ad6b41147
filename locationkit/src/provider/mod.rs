//! Geocoding provider abstraction
//!
//! This module provides traits and implementations for resolving addresses
//! and coordinates to places (Nominatim, Google) and for coarse IP-based
//! lookup (ip-api.com).
//!
//! # Factory Pattern
//!
//! For centralized provider creation, use the [`GeocoderFactory`]:
//!
//! ```ignore
//! use locationkit::provider::{AsyncReqwestClient, GeocoderConfig, GeocoderFactory};
//!
//! let http_client = AsyncReqwestClient::new()?;
//! let factory = GeocoderFactory::new(http_client);
//! let provider = factory.create(&GeocoderConfig::nominatim());
//! ```

mod factory;
mod google;
mod http;
mod ip_api;
mod nominatim;
mod types;

pub use factory::{AnyGeocodingProvider, GeocoderConfig, GeocoderFactory};
pub use google::GoogleGeocodingProvider;
pub use http::{AsyncHttpClient, AsyncReqwestClient};
pub use ip_api::{IpApiProvider, IP_API_URL};
pub use nominatim::{NominatimProvider, NOMINATIM_PUBLIC_URL};
pub use types::{GeocodeError, GeocodingProvider, IpLocationProvider};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
