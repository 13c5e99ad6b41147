//! Geocoding facade.
//!
//! [`Geocoder`] wraps a forward/reverse provider and an IP lookup provider,
//! logs each call and records its outcome in [`ServiceMetrics`]. Calls share
//! no state with the observer registry. Each one resolves to exactly one
//! success or one error, is never retried, and does not cancel earlier calls.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use locationkit::config::GeocoderSettings;
//! use locationkit::geocoder::Geocoder;
//! use locationkit::telemetry::ServiceMetrics;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let geocoder = Geocoder::from_settings(&GeocoderSettings::default(), Arc::new(ServiceMetrics::new()))?;
//! let place = geocoder.forward("Alexanderplatz, Berlin").await?;
//! println!("{:?}", place.coordinate);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ConfigFileError, GeocoderSettings};
use crate::model::{Coordinate, Place};
use crate::provider::{
    AnyGeocodingProvider, AsyncReqwestClient, GeocodeError, GeocoderFactory, GeocodingProvider,
    IpApiProvider, IpLocationProvider,
};
use crate::telemetry::ServiceMetrics;

/// Errors building a [`Geocoder`] from settings.
#[derive(Debug, Error)]
pub enum GeocoderSetupError {
    /// The settings select a provider they cannot configure
    #[error(transparent)]
    Config(#[from] ConfigFileError),

    /// The HTTP client could not be created
    #[error("{0}")]
    Client(#[from] GeocodeError),
}

/// Geocoding facade over a place provider and an IP lookup provider.
pub struct Geocoder<P = AnyGeocodingProvider, I = IpApiProvider<AsyncReqwestClient>> {
    provider: Arc<P>,
    ip_locator: Arc<I>,
    metrics: Arc<ServiceMetrics>,
}

impl<P, I> Clone for Geocoder<P, I> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            ip_locator: Arc::clone(&self.ip_locator),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl Geocoder {
    /// Build the configured providers over one reqwest client.
    pub fn from_settings(
        settings: &GeocoderSettings,
        metrics: Arc<ServiceMetrics>,
    ) -> Result<Self, GeocoderSetupError> {
        let config = settings.provider_config()?;
        let client = AsyncReqwestClient::with_config(settings.timeout, &settings.user_agent)?;
        let factory = GeocoderFactory::new(client);

        info!(provider = config.name(), "Geocoder configured");
        Ok(Self::new(
            factory.create(&config),
            factory.create_ip_locator(),
            metrics,
        ))
    }
}

impl<P, I> Geocoder<P, I>
where
    P: GeocodingProvider + 'static,
    I: IpLocationProvider + 'static,
{
    /// Create a geocoder from explicit providers.
    pub fn new(provider: P, ip_locator: I, metrics: Arc<ServiceMetrics>) -> Self {
        Self {
            provider: Arc::new(provider),
            ip_locator: Arc::new(ip_locator),
            metrics,
        }
    }

    /// Name of the forward/reverse provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// All candidate places for an address, best match first.
    pub async fn forward_all(&self, address: &str) -> Result<Vec<Place>, GeocodeError> {
        debug!(provider = self.provider.name(), address, "Forward geocode");
        let result = self.provider.geocode_address(address).await;
        self.record("forward", &result);
        result
    }

    /// Best-matching place for an address.
    pub async fn forward(&self, address: &str) -> Result<Place, GeocodeError> {
        first(self.forward_all(address).await)
    }

    /// All candidate places for a coordinate, closest first.
    pub async fn reverse_all(&self, coordinate: Coordinate) -> Result<Vec<Place>, GeocodeError> {
        debug!(provider = self.provider.name(), %coordinate, "Reverse geocode");
        let result = self.provider.reverse_geocode(coordinate).await;
        self.record("reverse", &result);
        result
    }

    /// Closest place for a coordinate.
    pub async fn reverse(&self, coordinate: Coordinate) -> Result<Place, GeocodeError> {
        first(self.reverse_all(coordinate).await)
    }

    /// Coarse place for the caller's public IP address.
    pub async fn locate_by_ip(&self) -> Result<Place, GeocodeError> {
        debug!(provider = self.ip_locator.name(), "IP lookup");
        let result = self.ip_locator.lookup().await;
        self.record("ip", &result);
        result
    }

    /// Forward-geocode on a background task, reporting through handlers.
    ///
    /// Exactly one handler runs, once.
    pub fn spawn_forward<S, E>(&self, address: String, on_success: S, on_error: E) -> JoinHandle<()>
    where
        S: FnOnce(Place) + Send + 'static,
        E: FnOnce(GeocodeError) + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            deliver(this.forward(&address).await, on_success, on_error);
        })
    }

    /// Reverse-geocode on a background task, reporting through handlers.
    pub fn spawn_reverse<S, E>(
        &self,
        coordinate: Coordinate,
        on_success: S,
        on_error: E,
    ) -> JoinHandle<()>
    where
        S: FnOnce(Place) + Send + 'static,
        E: FnOnce(GeocodeError) + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            deliver(this.reverse(coordinate).await, on_success, on_error);
        })
    }

    /// IP lookup on a background task, reporting through handlers.
    pub fn spawn_locate_by_ip<S, E>(&self, on_success: S, on_error: E) -> JoinHandle<()>
    where
        S: FnOnce(Place) + Send + 'static,
        E: FnOnce(GeocodeError) + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            deliver(this.locate_by_ip().await, on_success, on_error);
        })
    }

    fn record<T>(&self, operation: &'static str, result: &Result<T, GeocodeError>) {
        self.metrics.geocode_finished(result.is_ok());
        if let Err(error) = result {
            match error {
                GeocodeError::NoDataReturned => {
                    debug!(operation, provider = self.provider.name(), "No geocoding results")
                }
                _ => warn!(operation, error = %error, "Geocoding failed"),
            }
        }
    }
}

fn first(result: Result<Vec<Place>, GeocodeError>) -> Result<Place, GeocodeError> {
    result?.into_iter().next().ok_or(GeocodeError::NoDataReturned)
}

fn deliver<S, E>(result: Result<Place, GeocodeError>, on_success: S, on_error: E)
where
    S: FnOnce(Place),
    E: FnOnce(GeocodeError),
{
    match result {
        Ok(place) => on_success(place),
        Err(error) => on_error(error),
    }
}
