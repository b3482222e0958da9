//! Agent configuration.
//!
//! [`AgentConfig`] is built once at startup, usually from the command line
//! (see [`Cli`](crate::Cli)), and handed to the [`Agent`](crate::Agent).

use std::path::PathBuf;
use std::time::Duration;

use periphery_core::constants::{
    DEFAULT_ATTRIBUTE_TIMEOUT_MS, DEFAULT_DEVICE_DIR, DEFAULT_ENUMERATION_TIMEOUT_MS,
    DEFAULT_HEALTHCHECK_INTERVAL_SECS, DEFAULT_NAMESPACE, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SECONDARY_DEVICE_PREFIX, DEFAULT_USB_INIT_MAX_ATTEMPTS,
    DEFAULT_USB_INIT_RETRY_DELAY_SECS, LOCAL_AGENT_ADDRESS,
};
use periphery_core::{Error, Result};
use periphery_hardware::InitRetry;
use periphery_network::RegistryClientConfig;

/// Configuration of the discovery agent
///
/// # Example
///
/// ```
/// use periphery_agent::AgentConfig;
/// use std::time::Duration;
///
/// let config = AgentConfig {
///     poll_interval: Duration::from_secs(10),
///     ..AgentConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Base URL of the node's management API
    pub api_base_url: String,

    /// Pause between two discovery cycles
    pub poll_interval: Duration,

    /// Pause between two health check probes before the first cycle
    pub healthcheck_interval: Duration,

    /// Timeout of a single registry call
    pub request_timeout: Duration,

    /// Timeout of a single `udevadm` query
    pub attribute_timeout: Duration,

    /// Timeout of one device enumeration
    pub enumeration_timeout: Duration,

    /// Pause between USB subsystem initialization attempts
    pub usb_init_retry_delay: Duration,

    /// USB subsystem initialization attempts before giving up
    pub usb_init_max_attempts: u32,

    /// Directory scanned for secondary device nodes
    pub device_dir: PathBuf,

    /// Name prefix of secondary device nodes
    pub secondary_device_prefix: String,

    /// `udevadm` executable
    pub udevadm_path: PathBuf,

    /// Explicit `usb.ids` location; the well-known locations are searched
    /// when unset
    pub usb_ids_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_base_url: format!("http://{LOCAL_AGENT_ADDRESS}/api"),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            healthcheck_interval: Duration::from_secs(DEFAULT_HEALTHCHECK_INTERVAL_SECS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            attribute_timeout: Duration::from_millis(DEFAULT_ATTRIBUTE_TIMEOUT_MS),
            enumeration_timeout: Duration::from_millis(DEFAULT_ENUMERATION_TIMEOUT_MS),
            usb_init_retry_delay: Duration::from_secs(DEFAULT_USB_INIT_RETRY_DELAY_SECS),
            usb_init_max_attempts: DEFAULT_USB_INIT_MAX_ATTEMPTS,
            device_dir: PathBuf::from(DEFAULT_DEVICE_DIR),
            secondary_device_prefix: DEFAULT_SECONDARY_DEVICE_PREFIX.to_string(),
            udevadm_path: PathBuf::from("udevadm"),
            usb_ids_path: None,
        }
    }
}

impl AgentConfig {
    /// Check the values the agent cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingConfig` for an empty API URL or `udevadm` path
    /// and `Error::Config` for a zero interval or timeout.
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::MissingConfig("api_base_url".to_string()));
        }
        if self.udevadm_path.as_os_str().is_empty() {
            return Err(Error::MissingConfig("udevadm_path".to_string()));
        }

        let durations = [
            ("poll_interval", self.poll_interval),
            ("healthcheck_interval", self.healthcheck_interval),
            ("request_timeout", self.request_timeout),
            ("attribute_timeout", self.attribute_timeout),
            ("enumeration_timeout", self.enumeration_timeout),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(Error::Config(format!("{name} must be greater than zero")));
            }
        }

        Ok(())
    }

    pub fn registry_config(&self) -> RegistryClientConfig {
        RegistryClientConfig {
            base_url: self.api_base_url.clone(),
            timeout: self.request_timeout,
        }
    }

    pub fn init_retry(&self) -> InitRetry {
        InitRetry {
            delay: self.usb_init_retry_delay,
            max_attempts: self.usb_init_max_attempts,
        }
    }
}

/// Base URL of the management API for the current deployment.
///
/// Inside Kubernetes the API is the `agent` service of the node's namespace
/// (default `nuvlabox`); elsewhere it listens on localhost.
pub fn resolve_api_base_url(in_kubernetes: bool, namespace: Option<&str>) -> String {
    if in_kubernetes {
        let namespace = namespace
            .map(str::trim)
            .filter(|namespace| !namespace.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE);
        format!("http://agent.{namespace}/api")
    } else {
        format!("http://{LOCAL_AGENT_ADDRESS}/api")
    }
}
