//! Configuration file handling for ~/.locationkit/config.ini.
//!
//! Starts from [`ServiceConfig::default()`] and overlays any values found in
//! the INI. A missing file yields defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::{GeocoderKind, ServiceConfig};
use crate::model::{AuthorizationIntent, DeviceOrientation};

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFileError {
    fn invalid(section: &str, key: &str, value: &str, reason: &str) -> Self {
        ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Load configuration from a specific path.
///
/// If the file doesn't exist, returns defaults.
pub(super) fn load_from(path: &Path) -> Result<ServiceConfig, ConfigFileError> {
    if !path.exists() {
        return Ok(ServiceConfig::default());
    }

    let ini = Ini::load_from_file(path)?;
    parse_ini(&ini)
}

/// Parse an `Ini` object into a `ServiceConfig`.
pub(super) fn parse_ini(ini: &Ini) -> Result<ServiceConfig, ConfigFileError> {
    let mut config = ServiceConfig::default();

    // [authorization] section
    if let Some(section) = ini.section(Some("authorization")) {
        if let Some(v) = section.get("intent") {
            config.intent = match v.trim().to_lowercase().as_str() {
                "" | "none" => AuthorizationIntent::None,
                "when_in_use" => AuthorizationIntent::WhenInUse,
                "always" => AuthorizationIntent::Always,
                _ => {
                    return Err(ConfigFileError::invalid(
                        "authorization",
                        "intent",
                        v,
                        "must be one of: none, when_in_use, always",
                    ))
                }
            };
        }
        if let Some(v) = section.get("background_updates") {
            config.background_updates = parse_bool(v);
        }
    }

    // [heading] section
    if let Some(section) = ini.section(Some("heading")) {
        if let Some(v) = section.get("orientation") {
            config.orientation = parse_orientation(v).ok_or_else(|| {
                ConfigFileError::invalid(
                    "heading",
                    "orientation",
                    v,
                    "must be one of: unknown, portrait, portrait_upside_down, \
                     landscape_left, landscape_right, face_up, face_down",
                )
            })?;
        }
    }

    // [geocoding] section
    if let Some(section) = ini.section(Some("geocoding")) {
        if let Some(v) = section.get("provider") {
            config.geocoder.provider = match v.trim().to_lowercase().as_str() {
                "nominatim" => GeocoderKind::Nominatim,
                "google" => GeocoderKind::Google,
                _ => {
                    return Err(ConfigFileError::invalid(
                        "geocoding",
                        "provider",
                        v,
                        "must be one of: nominatim, google",
                    ))
                }
            };
        }
        if let Some(v) = section.get("google_api_key") {
            config.geocoder.google_api_key = non_empty(v);
        }
        if let Some(v) = section.get("language") {
            config.geocoder.language = non_empty(v);
        }
        if let Some(v) = section.get("timeout") {
            let secs: u64 = v.trim().parse().map_err(|_| {
                ConfigFileError::invalid("geocoding", "timeout", v, "must be a positive integer")
            })?;
            if secs == 0 {
                return Err(ConfigFileError::invalid(
                    "geocoding",
                    "timeout",
                    v,
                    "must be a positive integer",
                ));
            }
            config.geocoder.timeout = Duration::from_secs(secs);
        }
        if let Some(v) = section.get("nominatim_url") {
            if let Some(url) = non_empty(v) {
                config.geocoder.nominatim_url = url.trim_end_matches('/').to_string();
            }
        }
        if let Some(v) = section.get("user_agent") {
            if let Some(agent) = non_empty(v) {
                config.geocoder.user_agent = agent;
            }
        }
    }

    Ok(config)
}

fn parse_orientation(value: &str) -> Option<DeviceOrientation> {
    match value.trim().to_lowercase().as_str() {
        "unknown" => Some(DeviceOrientation::Unknown),
        "portrait" => Some(DeviceOrientation::Portrait),
        "portrait_upside_down" => Some(DeviceOrientation::PortraitUpsideDown),
        "landscape_left" => Some(DeviceOrientation::LandscapeLeft),
        "landscape_right" => Some(DeviceOrientation::LandscapeRight),
        "face_up" => Some(DeviceOrientation::FaceUp),
        "face_down" => Some(DeviceOrientation::FaceDown),
        _ => None,
    }
}

fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

fn non_empty(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Get the path to the config directory (~/.locationkit).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".locationkit")
}

/// Get the path to the config file (~/.locationkit/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
