//! ip-api.com coarse IP geolocation.
//!
//! No API key required for the free endpoint. Answers always come back as
//! HTTP 200; failures are reported through `status: "fail"` and a `message`:
//!
//! - `private range` / `reserved range` → [`GeocodeError::NoDataReturned`]
//! - anything else → [`GeocodeError::ProviderSpecific`] with the message verbatim
//!
//! Rate limiting is signalled with HTTP 429, which the HTTP client maps to
//! [`GeocodeError::QuotaExceeded`].

use serde::Deserialize;
use tracing::debug;

use crate::model::{Coordinate, Place};
use crate::provider::{AsyncHttpClient, GeocodeError, IpLocationProvider};

/// Default ip-api.com JSON endpoint, restricted to the fields used here.
pub const IP_API_URL: &str =
    "http://ip-api.com/json/?fields=status,message,country,countryCode,regionName,city,zip,lat,lon,query";

/// ip-api.com lookup of the caller's public address.
pub struct IpApiProvider<C: AsyncHttpClient> {
    http_client: C,
    url: String,
}

impl<C: AsyncHttpClient> IpApiProvider<C> {
    /// Creates a provider against the public endpoint.
    pub fn new(http_client: C) -> Self {
        Self::with_url(http_client, IP_API_URL)
    }

    /// Creates a provider against a custom endpoint.
    pub fn with_url(http_client: C, url: &str) -> Self {
        Self {
            http_client,
            url: url.to_string(),
        }
    }
}

impl<C: AsyncHttpClient> IpLocationProvider for IpApiProvider<C> {
    async fn lookup(&self) -> Result<Place, GeocodeError> {
        let body = self.http_client.get(&self.url).await?;
        parse_response(&body)
    }

    fn name(&self) -> &str {
        "ip-api"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    region_name: Option<String>,
    city: Option<String>,
    zip: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    query: Option<String>,
}

fn parse_response(body: &[u8]) -> Result<Place, GeocodeError> {
    let response: IpApiResponse = serde_json::from_slice(body)
        .map_err(|e| GeocodeError::InvalidResponse(format!("ip-api JSON: {}", e)))?;

    if response.status != "success" {
        let message = response.message.unwrap_or_default();
        debug!(query = ?response.query, message = %message, "ip-api lookup failed");
        return match message.as_str() {
            "private range" | "reserved range" => Err(GeocodeError::NoDataReturned),
            _ => Err(GeocodeError::ProviderSpecific(message)),
        };
    }

    let (Some(lat), Some(lon)) = (response.lat, response.lon) else {
        return Err(GeocodeError::NoDataReturned);
    };

    Ok(Place {
        coordinate: Coordinate::new(lat, lon),
        locality: response.city.filter(|v| !v.is_empty()),
        administrative_area: response.region_name.filter(|v| !v.is_empty()),
        postal_code: response.zip.filter(|v| !v.is_empty()),
        country: response.country,
        iso_country_code: response.country_code,
        ..Default::default()
    })
}
