//! HTTP client abstraction for testability

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, trace, warn};

use super::types::GeocodeError;

/// Trait for asynchronous HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response body as bytes or an error.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, GeocodeError>> + Send;

    /// Performs an async HTTP GET request with custom headers.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    /// * `headers` - Slice of (header_name, header_value) tuples
    fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> impl Future<Output = Result<Vec<u8>, GeocodeError>> + Send;
}

/// Default timeout for geocoding requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent string for HTTP requests.
const DEFAULT_USER_AGENT: &str = concat!("locationkit/", env!("CARGO_PKG_VERSION"));

/// Real HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new client with the default timeout and User-Agent.
    pub fn new() -> Result<Self, GeocodeError> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Creates a new client with a custom timeout and User-Agent.
    pub fn with_config(timeout: Duration, user_agent: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| GeocodeError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Vec<u8>, GeocodeError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match request.send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(GeocodeError::HttpError(format!("Request failed: {}", e)));
            }
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(url = url, "Provider rate limit hit");
            return Err(GeocodeError::QuotaExceeded(format!("HTTP {} from provider", status)));
        }
        if !status.is_success() {
            warn!(url = url, status = status.as_u16(), "HTTP error status");
            return Err(GeocodeError::HttpError(format!("HTTP {} from provider", status)));
        }

        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(bytes.to_vec())
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(GeocodeError::HttpError(format!(
                    "Failed to read response: {}",
                    e
                )))
            }
        }
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, GeocodeError> {
        self.send(self.client.get(url), url).await
    }

    async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Vec<u8>, GeocodeError> {
        let mut request = self.client.get(url);

        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        self.send(request, url).await
    }
}
