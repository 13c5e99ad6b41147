//! Geocoder factory for centralized provider creation.
//!
//! [`GeocoderConfig`] names a back end and carries its settings;
//! [`GeocoderFactory`] turns it into an [`AnyGeocodingProvider`] sharing one
//! HTTP client.

use super::google::GoogleGeocodingProvider;
use super::http::{AsyncHttpClient, AsyncReqwestClient};
use super::ip_api::IpApiProvider;
use super::nominatim::NominatimProvider;
use super::types::{GeocodeError, GeocodingProvider};
use crate::model::{Coordinate, Place};

/// Configuration for creating a geocoding provider.
///
/// # Example
///
/// ```
/// use locationkit::provider::GeocoderConfig;
///
/// let google = GeocoderConfig::google("YOUR_API_KEY");
/// assert!(google.requires_api_key());
/// assert_eq!(GeocoderConfig::nominatim().name(), "Nominatim");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocoderConfig {
    /// OpenStreetMap Nominatim.
    ///
    /// No API key required; the User-Agent identifies the application.
    Nominatim {
        base_url: String,
        user_agent: String,
        language: Option<String>,
    },

    /// Google Geocoding API.
    ///
    /// Requires a Google Maps Platform API key.
    Google {
        api_key: String,
        language: Option<String>,
    },
}

impl GeocoderConfig {
    /// Nominatim against the public OpenStreetMap instance.
    pub fn nominatim() -> Self {
        Self::Nominatim {
            base_url: super::nominatim::NOMINATIM_PUBLIC_URL.to_string(),
            user_agent: concat!("locationkit/", env!("CARGO_PKG_VERSION")).to_string(),
            language: None,
        }
    }

    /// Google with the given API key.
    pub fn google(api_key: impl Into<String>) -> Self {
        Self::Google {
            api_key: api_key.into(),
            language: None,
        }
    }

    /// Human-readable provider name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nominatim { .. } => "Nominatim",
            Self::Google { .. } => "Google",
        }
    }

    /// Whether this provider needs an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Google { .. })
    }
}

/// Enum to hold the concrete provider types behind one interface.
pub enum AnyGeocodingProvider<C: AsyncHttpClient = AsyncReqwestClient> {
    Nominatim(NominatimProvider<C>),
    Google(GoogleGeocodingProvider<C>),
}

impl<C: AsyncHttpClient> GeocodingProvider for AnyGeocodingProvider<C> {
    async fn geocode_address(&self, address: &str) -> Result<Vec<Place>, GeocodeError> {
        match self {
            Self::Nominatim(p) => p.geocode_address(address).await,
            Self::Google(p) => p.geocode_address(address).await,
        }
    }

    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Vec<Place>, GeocodeError> {
        match self {
            Self::Nominatim(p) => p.reverse_geocode(coordinate).await,
            Self::Google(p) => p.reverse_geocode(coordinate).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Nominatim(p) => p.name(),
            Self::Google(p) => p.name(),
        }
    }
}

/// Factory for creating geocoding providers from configuration.
pub struct GeocoderFactory<C: AsyncHttpClient + Clone = AsyncReqwestClient> {
    http_client: C,
}

impl<C: AsyncHttpClient + Clone> GeocoderFactory<C> {
    /// Create a new factory with the given HTTP client.
    pub fn new(http_client: C) -> Self {
        Self { http_client }
    }

    /// Create the forward/reverse provider the configuration selects.
    pub fn create(&self, config: &GeocoderConfig) -> AnyGeocodingProvider<C> {
        match config {
            GeocoderConfig::Nominatim {
                base_url,
                user_agent,
                language,
            } => AnyGeocodingProvider::Nominatim(
                NominatimProvider::new(self.http_client.clone(), base_url, user_agent)
                    .with_language(language.clone()),
            ),
            GeocoderConfig::Google { api_key, language } => AnyGeocodingProvider::Google(
                GoogleGeocodingProvider::new(self.http_client.clone(), api_key.clone())
                    .with_language(language.clone()),
            ),
        }
    }

    /// Create the IP lookup provider.
    pub fn create_ip_locator(&self) -> IpApiProvider<C> {
        IpApiProvider::new(self.http_client.clone())
    }
}
