//! Google Geocoding API provider.
//!
//! Requires a Google Maps Platform API key with the Geocoding API enabled.
//!
//! # API Endpoint
//!
//! - Forward: `https://maps.googleapis.com/maps/api/geocode/json?address={ADDRESS}&key={API_KEY}`
//! - Reverse: `https://maps.googleapis.com/maps/api/geocode/json?latlng={LAT},{LNG}&key={API_KEY}`
//!
//! # Status Mapping
//!
//! Google reports failures in the JSON `status` field of an HTTP 200 response:
//!
//! | Status                                  | Error                 |
//! |-----------------------------------------|-----------------------|
//! | `ZERO_RESULTS`                          | `NoDataReturned`      |
//! | `OVER_QUERY_LIMIT`, `OVER_DAILY_LIMIT`  | `QuotaExceeded`       |
//! | `REQUEST_DENIED`                        | `RequestDenied`       |
//! | `INVALID_REQUEST`                       | `InvalidRequest`      |
//! | anything else                           | `ProviderSpecific`    |

use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use super::types::{validate_address, validate_coordinate};
use crate::model::{Coordinate, Place};
use crate::provider::{AsyncHttpClient, GeocodeError, GeocodingProvider};

const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Google Geocoding API provider.
///
/// # Example
///
/// ```no_run
/// use locationkit::provider::{AsyncReqwestClient, GeocodingProvider, GoogleGeocodingProvider};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = AsyncReqwestClient::new()?;
/// let provider = GoogleGeocodingProvider::new(client, "YOUR_API_KEY".to_string());
/// let places = provider.geocode_address("1600 Amphitheatre Parkway").await?;
/// # Ok(())
/// # }
/// ```
pub struct GoogleGeocodingProvider<C: AsyncHttpClient> {
    http_client: C,
    api_key: String,
    language: Option<String>,
}

impl<C: AsyncHttpClient> GoogleGeocodingProvider<C> {
    /// Creates a new Google provider with the given API key.
    pub fn new(http_client: C, api_key: String) -> Self {
        Self {
            http_client,
            api_key,
            language: None,
        }
    }

    /// Requests results in the given language (e.g. "de").
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    fn build_url(&self, query: (&str, String)) -> Result<Url, GeocodeError> {
        let mut params = vec![query, ("key", self.api_key.clone())];
        if let Some(language) = &self.language {
            params.push(("language", language.clone()));
        }
        Url::parse_with_params(GEOCODE_ENDPOINT, &params)
            .map_err(|e| GeocodeError::InvalidRequest(e.to_string()))
    }

    fn address_url(&self, address: &str) -> Result<Url, GeocodeError> {
        self.build_url(("address", address.to_string()))
    }

    fn latlng_url(&self, coordinate: Coordinate) -> Result<Url, GeocodeError> {
        self.build_url((
            "latlng",
            format!("{},{}", coordinate.latitude, coordinate.longitude),
        ))
    }

    async fn fetch(&self, url: Url) -> Result<Vec<Place>, GeocodeError> {
        let body = self.http_client.get(url.as_str()).await?;
        parse_response(&body)
    }
}

impl<C: AsyncHttpClient> GeocodingProvider for GoogleGeocodingProvider<C> {
    async fn geocode_address(&self, address: &str) -> Result<Vec<Place>, GeocodeError> {
        let address = validate_address(address)?;
        let url = self.address_url(address)?;
        self.fetch(url).await
    }

    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Vec<Place>, GeocodeError> {
        validate_coordinate(coordinate)?;
        let url = self.latlng_url(coordinate)?;
        self.fetch(url).await
    }

    fn name(&self) -> &str {
        "Google"
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: Option<String>,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    short_name: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Parses a Geocoding API response body into places.
fn parse_response(body: &[u8]) -> Result<Vec<Place>, GeocodeError> {
    let response: GeocodeResponse = serde_json::from_slice(body)
        .map_err(|e| GeocodeError::InvalidResponse(format!("Google geocode JSON: {}", e)))?;

    let message = response.error_message.unwrap_or_default();
    debug!(status = %response.status, results = response.results.len(), "Google geocode response");

    match response.status.as_str() {
        "OK" if response.results.is_empty() => Err(GeocodeError::NoDataReturned),
        "OK" => Ok(response.results.into_iter().map(into_place).collect()),
        "ZERO_RESULTS" => Err(GeocodeError::NoDataReturned),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => Err(GeocodeError::QuotaExceeded(message)),
        "REQUEST_DENIED" => Err(GeocodeError::RequestDenied(message)),
        "INVALID_REQUEST" => Err(GeocodeError::InvalidRequest(message)),
        other if message.is_empty() => Err(GeocodeError::ProviderSpecific(other.to_string())),
        _ => Err(GeocodeError::ProviderSpecific(message)),
    }
}

fn into_place(result: GeocodeResult) -> Place {
    let component = |kind: &str| {
        result
            .address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
    };
    let long = |kind: &str| component(kind).map(|c| c.long_name.clone());

    let thoroughfare = match (long("route"), long("street_number")) {
        (Some(route), Some(number)) => Some(format!("{} {}", number, route)),
        (route, _) => route,
    };

    Place {
        coordinate: Coordinate::new(result.geometry.location.lat, result.geometry.location.lng),
        name: long("point_of_interest")
            .or_else(|| long("establishment"))
            .or_else(|| long("premise")),
        thoroughfare,
        locality: long("locality").or_else(|| long("postal_town")),
        administrative_area: long("administrative_area_level_1"),
        postal_code: long("postal_code"),
        country: long("country"),
        iso_country_code: component("country").map(|c| c.short_name.clone()),
        formatted_address: result.formatted_address.clone(),
    }
}
