//! OpenStreetMap Nominatim provider.
//!
//! No API key required. The public instance's usage policy asks for an
//! identifying User-Agent and at most one request per second; self-hosted
//! instances can be targeted with a custom base URL.
//!
//! # API Endpoints
//!
//! - Forward: `{base}/search?q={ADDRESS}&format=jsonv2&addressdetails=1`
//! - Reverse: `{base}/reverse?lat={LAT}&lon={LON}&format=jsonv2&addressdetails=1`
//!
//! Search answers with a JSON array; reverse answers with a single object, or
//! `{"error": "Unable to geocode"}` when nothing is nearby.

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::types::{validate_address, validate_coordinate};
use crate::model::{Coordinate, Place};
use crate::provider::{AsyncHttpClient, GeocodeError, GeocodingProvider};

/// Public OpenStreetMap instance.
pub const NOMINATIM_PUBLIC_URL: &str = "https://nominatim.openstreetmap.org";

/// Maximum results requested from a forward search.
const SEARCH_LIMIT: &str = "5";

/// OpenStreetMap Nominatim geocoding provider.
pub struct NominatimProvider<C: AsyncHttpClient> {
    http_client: C,
    base_url: String,
    user_agent: String,
    language: Option<String>,
}

impl<C: AsyncHttpClient> NominatimProvider<C> {
    /// Creates a provider against the given instance.
    pub fn new(http_client: C, base_url: &str, user_agent: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            language: None,
        }
    }

    /// Requests results in the given language (sent as `accept-language`).
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    fn build_url(&self, endpoint: &str, mut params: Vec<(&str, String)>) -> Result<Url, GeocodeError> {
        params.push(("format", "jsonv2".to_string()));
        params.push(("addressdetails", "1".to_string()));
        if let Some(language) = &self.language {
            params.push(("accept-language", language.clone()));
        }
        Url::parse_with_params(&format!("{}/{}", self.base_url, endpoint), &params)
            .map_err(|e| GeocodeError::InvalidRequest(e.to_string()))
    }

    fn search_url(&self, address: &str) -> Result<Url, GeocodeError> {
        self.build_url(
            "search",
            vec![("q", address.to_string()), ("limit", SEARCH_LIMIT.to_string())],
        )
    }

    fn reverse_url(&self, coordinate: Coordinate) -> Result<Url, GeocodeError> {
        self.build_url(
            "reverse",
            vec![
                ("lat", coordinate.latitude.to_string()),
                ("lon", coordinate.longitude.to_string()),
            ],
        )
    }

    async fn fetch(&self, url: Url) -> Result<Vec<Place>, GeocodeError> {
        let body = self
            .http_client
            .get_with_headers(url.as_str(), &[("User-Agent", self.user_agent.as_str())])
            .await?;
        parse_response(&body)
    }
}

impl<C: AsyncHttpClient> GeocodingProvider for NominatimProvider<C> {
    async fn geocode_address(&self, address: &str) -> Result<Vec<Place>, GeocodeError> {
        let address = validate_address(address)?;
        let url = self.search_url(address)?;
        self.fetch(url).await
    }

    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Vec<Place>, GeocodeError> {
        validate_coordinate(coordinate)?;
        let url = self.reverse_url(coordinate)?;
        self.fetch(url).await
    }

    fn name(&self) -> &str {
        "Nominatim"
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    name: Option<String>,
    display_name: Option<String>,
    #[serde(default)]
    address: NominatimAddress,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    house_number: Option<String>,
    road: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

/// Parses a search (array) or reverse (object) response into places.
fn parse_response(body: &[u8]) -> Result<Vec<Place>, GeocodeError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| GeocodeError::InvalidResponse(format!("Nominatim JSON: {}", e)))?;

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(object) if object.contains_key("error") => {
            debug!(error = %object["error"], "Nominatim returned no match");
            return Err(GeocodeError::NoDataReturned);
        }
        Value::Object(object) => vec![Value::Object(object)],
        other => {
            return Err(GeocodeError::InvalidResponse(format!(
                "unexpected Nominatim payload: {}",
                other
            )))
        }
    };

    let places = entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value::<NominatimPlace>(entry)
                .map_err(|e| GeocodeError::InvalidResponse(format!("Nominatim place: {}", e)))
                .and_then(into_place)
        })
        .collect::<Result<Vec<_>, _>>()?;

    if places.is_empty() {
        return Err(GeocodeError::NoDataReturned);
    }
    Ok(places)
}

fn into_place(entry: NominatimPlace) -> Result<Place, GeocodeError> {
    let parse = |field: &str, raw: &str| {
        raw.parse::<f64>().map_err(|_| {
            GeocodeError::InvalidResponse(format!("Nominatim {} is not a number: {}", field, raw))
        })
    };
    let coordinate = Coordinate::new(parse("lat", &entry.lat)?, parse("lon", &entry.lon)?);
    let address = entry.address;

    let thoroughfare = match (address.road, address.house_number) {
        (Some(road), Some(number)) => Some(format!("{} {}", road, number)),
        (road, _) => road,
    };

    Ok(Place {
        coordinate,
        name: entry.name.filter(|n| !n.is_empty()),
        thoroughfare,
        locality: address
            .city
            .or(address.town)
            .or(address.village)
            .or(address.hamlet),
        administrative_area: address.state,
        postal_code: address.postcode,
        country: address.country,
        iso_country_code: address.country_code.map(|c| c.to_uppercase()),
        formatted_address: entry.display_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;

    const REVERSE_BODY: &str = r#"{
        "place_id": 1,
        "lat": "52.5162746",
        "lon": "13.3777041",
        "name": "Brandenburger Tor",
        "display_name": "Brandenburger Tor, Pariser Platz, Mitte, Berlin, 10117, Deutschland",
        "address": {
            "road": "Pariser Platz",
            "city": "Berlin",
            "state": "Berlin",
            "postcode": "10117",
            "country": "Deutschland",
            "country_code": "de"
        }
    }"#;

    fn provider(body: &str) -> NominatimProvider<MockAsyncHttpClient> {
        NominatimProvider::new(
            MockAsyncHttpClient::json(body),
            "https://nominatim.example.org/",
            "locationkit-tests",
        )
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(provider("[]").name(), "Nominatim");
    }

    #[test]
    fn test_search_url() {
        let url = provider("[]").search_url("Pariser Platz, Berlin").unwrap();
        assert_eq!(
            url.as_str(),
            "https://nominatim.example.org/search?q=Pariser+Platz%2C+Berlin&limit=5&format=jsonv2&addressdetails=1"
        );
    }

    #[test]
    fn test_reverse_url_with_language() {
        let provider = provider("{}").with_language(Some("en".to_string()));
        let url = provider.reverse_url(Coordinate::new(52.5, 13.25)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://nominatim.example.org/reverse?lat=52.5&lon=13.25&format=jsonv2&addressdetails=1&accept-language=en"
        );
    }

    #[test]
    fn test_parse_reverse_object() {
        let places = parse_response(REVERSE_BODY.as_bytes()).unwrap();
        assert_eq!(places.len(), 1);

        let place = &places[0];
        assert_eq!(place.name.as_deref(), Some("Brandenburger Tor"));
        assert_eq!(place.thoroughfare.as_deref(), Some("Pariser Platz"));
        assert_eq!(place.locality.as_deref(), Some("Berlin"));
        assert_eq!(place.iso_country_code.as_deref(), Some("DE"));
        assert!((place.coordinate.longitude - 13.3777041).abs() < 1e-9);
    }

    #[test]
    fn test_parse_search_array() {
        let body = format!("[{}, {}]", REVERSE_BODY, REVERSE_BODY);
        let places = parse_response(body.as_bytes()).unwrap();
        assert_eq!(places.len(), 2);
    }

    #[test]
    fn test_town_used_when_no_city() {
        let body = r#"{"lat": "1", "lon": "2", "address": {"town": "Kleinstadt", "road": "Hauptstr.", "house_number": "3"}}"#;
        let places = parse_response(body.as_bytes()).unwrap();
        assert_eq!(places[0].locality.as_deref(), Some("Kleinstadt"));
        assert_eq!(places[0].thoroughfare.as_deref(), Some("Hauptstr. 3"));
    }

    #[test]
    fn test_empty_and_error_are_no_data() {
        assert_eq!(parse_response(b"[]"), Err(GeocodeError::NoDataReturned));
        assert_eq!(
            parse_response(br#"{"error": "Unable to geocode"}"#),
            Err(GeocodeError::NoDataReturned)
        );
    }

    #[test]
    fn test_bad_coordinate_is_invalid_response() {
        let body = br#"[{"lat": "north", "lon": "2"}]"#;
        assert!(matches!(
            parse_response(body),
            Err(GeocodeError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_reverse_geocode_round_trip() {
        let provider = provider(REVERSE_BODY);
        let places = provider
            .reverse_geocode(Coordinate::new(52.5162746, 13.3777041))
            .await
            .unwrap();

        assert_eq!(places[0].postal_code.as_deref(), Some("10117"));
        assert!(provider
            .http_client
            .last_url()
            .unwrap()
            .starts_with("https://nominatim.example.org/reverse?"));
    }
}
