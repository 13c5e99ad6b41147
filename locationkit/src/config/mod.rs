//! Service configuration.
//!
//! [`ServiceConfig`] carries everything the service reads once at
//! construction: the application's declared authorization intent, the
//! background-delivery entitlement, the initial heading orientation, and the
//! geocoding settings.
//!
//! Configuration can be built in code with the `with_*` methods or loaded from
//! an INI file (see [`file`]):
//!
//! ```ini
//! [authorization]
//! intent = when_in_use
//! background_updates = false
//!
//! [heading]
//! orientation = portrait
//!
//! [geocoding]
//! provider = google
//! google_api_key = YOUR_KEY
//! language = en
//! timeout = 30
//! ```

pub mod file;

use std::time::Duration;

pub use file::{config_file_path, ConfigFileError};

use crate::model::{AuthorizationIntent, DeviceOrientation};
use crate::provider::GeocoderConfig;

/// Default HTTP timeout for geocoding calls, in seconds.
pub const DEFAULT_GEOCODER_TIMEOUT_SECS: u64 = 30;

/// Default OpenStreetMap Nominatim endpoint.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Default User-Agent sent to geocoding services.
pub const DEFAULT_USER_AGENT: &str = concat!("locationkit/", env!("CARGO_PKG_VERSION"));

/// Which forward/reverse geocoding back end to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeocoderKind {
    /// OpenStreetMap Nominatim (no API key).
    #[default]
    Nominatim,
    /// Google Geocoding API (API key required).
    Google,
}

/// Geocoding settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocoderSettings {
    /// Selected back end.
    pub provider: GeocoderKind,
    /// Google Geocoding API key.
    pub google_api_key: Option<String>,
    /// Preferred result language (e.g. "en", "de").
    pub language: Option<String>,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Nominatim base URL.
    pub nominatim_url: String,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            provider: GeocoderKind::default(),
            google_api_key: None,
            language: None,
            timeout: Duration::from_secs(DEFAULT_GEOCODER_TIMEOUT_SECS),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl GeocoderSettings {
    /// Build the provider configuration these settings select.
    ///
    /// Fails if Google is selected without an API key.
    pub fn provider_config(&self) -> Result<GeocoderConfig, ConfigFileError> {
        match self.provider {
            GeocoderKind::Nominatim => Ok(GeocoderConfig::Nominatim {
                base_url: self.nominatim_url.clone(),
                user_agent: self.user_agent.clone(),
                language: self.language.clone(),
            }),
            GeocoderKind::Google => match self.google_api_key.as_deref() {
                Some(key) if !key.trim().is_empty() => Ok(GeocoderConfig::Google {
                    api_key: key.to_string(),
                    language: self.language.clone(),
                }),
                _ => Err(ConfigFileError::InvalidValue {
                    section: "geocoding".to_string(),
                    key: "google_api_key".to_string(),
                    value: String::new(),
                    reason: "required when provider = google".to_string(),
                }),
            },
        }
    }
}

/// Configuration read by [`crate::service::LocationService`] at construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceConfig {
    /// Declared authorization intent.
    pub intent: AuthorizationIntent,
    /// Whether the app is entitled to background location delivery.
    pub background_updates: bool,
    /// Initial device orientation for heading updates.
    pub orientation: DeviceOrientation,
    /// Geocoding settings.
    pub geocoder: GeocoderSettings,
}

impl ServiceConfig {
    /// Create a configuration with the given declared intent.
    pub fn new(intent: AuthorizationIntent) -> Self {
        Self {
            intent,
            ..Default::default()
        }
    }

    /// Load from the default path (~/.locationkit/config.ini).
    ///
    /// A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        file::load_from(&config_file_path())
    }

    /// Load from a specific INI file. A missing file yields defaults.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigFileError> {
        file::load_from(path)
    }

    /// Set the declared intent.
    pub fn with_intent(mut self, intent: AuthorizationIntent) -> Self {
        self.intent = intent;
        self
    }

    /// Declare or withdraw the background-delivery entitlement.
    pub fn with_background_updates(mut self, enabled: bool) -> Self {
        self.background_updates = enabled;
        self
    }

    /// Set the initial heading orientation.
    pub fn with_orientation(mut self, orientation: DeviceOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Replace the geocoding settings.
    pub fn with_geocoder(mut self, geocoder: GeocoderSettings) -> Self {
        self.geocoder = geocoder;
        self
    }
}
