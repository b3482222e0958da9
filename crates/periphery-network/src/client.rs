//! HTTP client for the node's peripheral registry.
//!
//! This module provides the client the discovery agent uses to read and write
//! USB peripheral records through the node's management API.
//!
//! # Architecture
//!
//! ```text
//! Agent (poll loop)
//!     │
//!     ├─> fetch_usb_peripherals ──GET────> {base}/peripheral?parameter=interface&value=USB
//!     ├─> create ─────────────────POST───> {base}/peripheral
//!     ├─> update ─────────────────PUT────> {base}/peripheral/{identifier}
//!     └─> delete ─────────────────DELETE─> {base}/peripheral/{identifier}
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use periphery_network::{RegistryApi, RegistryClient, RegistryClientConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RegistryClient::new(RegistryClientConfig {
//!     base_url: "http://localhost:5080/api".to_string(),
//!     timeout: Duration::from_secs(10),
//! })?;
//!
//! let registered = client.fetch_usb_peripherals().await?;
//! for (identifier, record) in &registered {
//!     println!("{identifier}: {}", record.peripheral.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Design Principles
//!
//! - **No automatic retry**: Each call is attempted once; the poll loop's
//!   next cycle is the retry.
//! - **Bounded**: Every request carries the configured timeout.
//! - **Registry fields stay remote**: Request bodies are bare
//!   [`Peripheral`] records, never `id`/`version`/`parent`.

#![allow(async_fn_in_trait)]

use std::collections::BTreeMap;
use std::time::Duration;

use periphery_core::constants::{
    DEFAULT_REQUEST_TIMEOUT_MS, FILTER_PARAMETER, HEALTHCHECK_PATH, INTERFACE_USB,
    LOCAL_AGENT_ADDRESS, PERIPHERAL_PATH,
};
use periphery_core::{Peripheral, RemotePeripheral, parse_registry_listing};
use reqwest::{Method, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Configuration for the registry client
///
/// # Example
///
/// ```
/// use periphery_network::RegistryClientConfig;
/// use std::time::Duration;
///
/// let config = RegistryClientConfig {
///     base_url: "http://agent.nuvlabox/api".to_string(),
///     timeout: Duration::from_secs(5),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct RegistryClientConfig {
    /// Base URL of the management API, e.g. `http://localhost:5080/api`
    pub base_url: String,

    /// Timeout for every HTTP call
    pub timeout: Duration,
}

impl Default for RegistryClientConfig {
    fn default() -> Self {
        Self {
            base_url: format!("http://{LOCAL_AGENT_ADDRESS}/api"),
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

/// Errors that can occur during registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Base URL cannot be used to build request URLs
    #[error("Invalid registry URL: {0}")]
    InvalidUrl(String),

    /// Request did not complete within the timeout
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Connection-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Registry answered with a non-success status
    #[error("Registry returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Invalid registry response: {0}")]
    Decode(String),
}

/// Operations the agent performs against the peripheral registry.
///
/// [`RegistryClient`] implements this over HTTP; tests substitute in-memory
/// registries.
pub trait RegistryApi: Send + Sync {
    /// Whether the management API reports itself ready.
    async fn is_healthy(&self) -> bool;

    /// Registered USB peripherals, keyed by identifier.
    async fn fetch_usb_peripherals(
        &self,
    ) -> Result<BTreeMap<String, RemotePeripheral>, RegistryError>;

    /// Register a new peripheral.
    async fn create(&self, peripheral: &Peripheral) -> Result<(), RegistryError>;

    /// Replace the record registered under `identifier`.
    async fn update(&self, identifier: &str, peripheral: &Peripheral)
    -> Result<(), RegistryError>;

    /// Remove the record registered under `identifier`.
    async fn delete(&self, identifier: &str) -> Result<(), RegistryError>;
}

/// HTTP client for the peripheral registry
pub struct RegistryClient {
    /// Base URL of the management API
    base_url: Url,

    /// Shared HTTP client with the configured timeout
    http: reqwest::Client,

    /// Timeout applied to every request
    timeout: Duration,
}

impl RegistryClient {
    /// Create a new registry client with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute `http(s)` URL or
    /// the HTTP client cannot be built.
    ///
    /// # Example
    ///
    /// ```
    /// use periphery_network::{RegistryClient, RegistryClientConfig};
    ///
    /// let client = RegistryClient::new(RegistryClientConfig::default()).unwrap();
    /// assert_eq!(client.base_url().as_str(), "http://localhost:5080/api");
    /// ```
    pub fn new(config: RegistryClientConfig) -> Result<Self, RegistryError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RegistryError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidUrl(config.base_url));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("periphery/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        debug!("Creating registry client for {}", base_url);

        Ok(Self {
            base_url,
            http,
            timeout: config.timeout,
        })
    }

    /// Base URL of the management API
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/{segments...}`, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RegistryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RegistryError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn peripheral_url(&self, identifier: Option<&str>) -> Result<Url, RegistryError> {
        let collection = PERIPHERAL_PATH.trim_start_matches('/');
        match identifier {
            Some(identifier) => self.endpoint(&[collection, identifier]),
            None => self.endpoint(&[collection]),
        }
    }

    /// Send a request and fail on transport errors or non-success statuses
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Peripheral>,
    ) -> Result<reqwest::Response, RegistryError> {
        trace!(%method, %url, "Sending registry request");

        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%method, %url, status = status.as_u16(), "Registry request rejected");
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    fn transport_error(&self, error: reqwest::Error) -> RegistryError {
        if error.is_timeout() {
            RegistryError::Timeout(self.timeout.as_millis() as u64)
        } else {
            RegistryError::Transport(error.to_string())
        }
    }
}

impl RegistryApi for RegistryClient {
    async fn is_healthy(&self) -> bool {
        let Ok(url) = self.endpoint(&[HEALTHCHECK_PATH.trim_start_matches('/')]) else {
            return false;
        };

        match self.http.get(url).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                trace!("Health check failed: {}", e);
                false
            }
        }
    }

    async fn fetch_usb_peripherals(
        &self,
    ) -> Result<BTreeMap<String, RemotePeripheral>, RegistryError> {
        let mut url = self.peripheral_url(None)?;
        url.query_pairs_mut()
            .append_pair("parameter", FILTER_PARAMETER)
            .append_pair("value", INTERFACE_USB);

        debug!("Getting existing USB peripherals through {}", url);
        let response = self.send(Method::GET, url, None).await?;
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        let listing =
            parse_registry_listing(&body).map_err(|e| RegistryError::Decode(e.to_string()))?;
        debug!(count = listing.len(), "Fetched registered USB peripherals");
        Ok(listing)
    }

    async fn create(&self, peripheral: &Peripheral) -> Result<(), RegistryError> {
        let url = self.peripheral_url(None)?;
        self.send(Method::POST, url, Some(peripheral)).await?;
        Ok(())
    }

    async fn update(
        &self,
        identifier: &str,
        peripheral: &Peripheral,
    ) -> Result<(), RegistryError> {
        let url = self.peripheral_url(Some(identifier))?;
        self.send(Method::PUT, url, Some(peripheral)).await?;
        Ok(())
    }

    async fn delete(&self, identifier: &str) -> Result<(), RegistryError> {
        let url = self.peripheral_url(Some(identifier))?;
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> RegistryClient {
        RegistryClient::new(RegistryClientConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_millis(100),
        })
        .unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = RegistryClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:5080/api");
        assert_eq!(config.timeout.as_millis(), 10_000);
    }

    #[test]
    fn test_invalid_base_url() {
        for base_url in ["not a url", "localhost:5080/api", "ftp://agent/api"] {
            let result = RegistryClient::new(RegistryClientConfig {
                base_url: base_url.to_string(),
                timeout: Duration::from_secs(1),
            });
            assert!(
                matches!(result, Err(RegistryError::InvalidUrl(_))),
                "{base_url}"
            );
        }
    }

    #[test]
    fn test_peripheral_urls() {
        let client = client("http://agent.nuvlabox/api");
        assert_eq!(
            client.peripheral_url(None).unwrap().as_str(),
            "http://agent.nuvlabox/api/peripheral"
        );
        assert_eq!(
            client.peripheral_url(Some("046d:0825")).unwrap().as_str(),
            "http://agent.nuvlabox/api/peripheral/046d:0825"
        );
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let client = client("http://localhost:5080/api/");
        assert_eq!(
            client.peripheral_url(None).unwrap().as_str(),
            "http://localhost:5080/api/peripheral"
        );
    }

    #[test]
    fn test_identifier_is_a_single_path_segment() {
        let client = client("http://localhost:5080/api");
        assert_eq!(
            client.peripheral_url(Some("a/b")).unwrap().as_str(),
            "http://localhost:5080/api/peripheral/a%2Fb"
        );
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_unhealthy() {
        // RFC 5737 TEST-NET-1, nothing answers there
        let client = client("http://192.0.2.1:9999/api");
        assert!(!client.is_healthy().await);
    }

    #[tokio::test]
    async fn test_fetch_from_unreachable_registry() {
        let client = client("http://192.0.2.1:9999/api");
        let result = client.fetch_usb_peripherals().await;
        assert!(matches!(
            result,
            Err(RegistryError::Timeout(_)) | Err(RegistryError::Transport(_))
        ));
    }
}
