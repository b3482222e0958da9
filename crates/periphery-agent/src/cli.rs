//! Command line of the `periphery-agent` binary.
//!
//! Every option can also be set through the environment variable named in
//! its help text.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use periphery_core::constants::{
    DEFAULT_ATTRIBUTE_TIMEOUT_MS, DEFAULT_DEVICE_DIR, DEFAULT_ENUMERATION_TIMEOUT_MS,
    DEFAULT_HEALTHCHECK_INTERVAL_SECS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_SECONDARY_DEVICE_PREFIX, DEFAULT_USB_INIT_MAX_ATTEMPTS,
    DEFAULT_USB_INIT_RETRY_DELAY_SECS,
};

use crate::config::{AgentConfig, resolve_api_base_url};

#[derive(Parser, Debug)]
#[command(name = "periphery-agent")]
#[command(
    version,
    about = "Mirror the attached USB peripherals into the node's peripheral registry",
    long_about = None
)]
pub struct Cli {
    /// Management API base URL (derived from the deployment when unset)
    #[arg(long, env = "PERIPHERY_API_URL")]
    pub api_url: Option<String>,

    /// Namespace of the agent service when running in Kubernetes
    #[arg(long, env = "MY_NAMESPACE")]
    pub namespace: Option<String>,

    /// Seconds between two discovery cycles
    #[arg(long, env = "PERIPHERY_POLL_INTERVAL", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval: u64,

    /// Seconds between two health checks before the first cycle
    #[arg(
        long,
        env = "PERIPHERY_HEALTHCHECK_INTERVAL",
        default_value_t = DEFAULT_HEALTHCHECK_INTERVAL_SECS,
    )]
    pub healthcheck_interval: u64,

    /// Registry request timeout in milliseconds
    #[arg(long, env = "PERIPHERY_REQUEST_TIMEOUT_MS", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,

    /// udevadm query timeout in milliseconds
    #[arg(
        long,
        env = "PERIPHERY_ATTRIBUTE_TIMEOUT_MS",
        default_value_t = DEFAULT_ATTRIBUTE_TIMEOUT_MS,
    )]
    pub attribute_timeout_ms: u64,

    /// USB enumeration timeout in milliseconds
    #[arg(
        long,
        env = "PERIPHERY_ENUMERATION_TIMEOUT_MS",
        default_value_t = DEFAULT_ENUMERATION_TIMEOUT_MS,
    )]
    pub enumeration_timeout_ms: u64,

    /// Seconds between USB subsystem initialization attempts
    #[arg(
        long,
        env = "PERIPHERY_USB_INIT_RETRY_DELAY",
        default_value_t = DEFAULT_USB_INIT_RETRY_DELAY_SECS,
    )]
    pub usb_init_retry_delay: u64,

    /// USB subsystem initialization attempts before giving up
    #[arg(
        long,
        env = "PERIPHERY_USB_INIT_ATTEMPTS",
        default_value_t = DEFAULT_USB_INIT_MAX_ATTEMPTS,
    )]
    pub usb_init_attempts: u32,

    /// Directory scanned for secondary device nodes
    #[arg(long, env = "PERIPHERY_DEVICE_DIR", default_value = DEFAULT_DEVICE_DIR)]
    pub device_dir: PathBuf,

    /// Name prefix of secondary device nodes
    #[arg(
        long,
        env = "PERIPHERY_SECONDARY_PREFIX",
        default_value = DEFAULT_SECONDARY_DEVICE_PREFIX,
    )]
    pub secondary_prefix: String,

    /// udevadm executable
    #[arg(long, env = "PERIPHERY_UDEVADM", default_value = "udevadm")]
    pub udevadm: PathBuf,

    /// usb.ids database (well-known locations are searched when unset)
    #[arg(long, env = "PERIPHERY_USB_IDS")]
    pub usb_ids: Option<PathBuf>,
}

impl Cli {
    /// Build the agent configuration.
    ///
    /// `in_kubernetes` selects the in-cluster API address when no
    /// `--api-url` was given.
    pub fn into_config(self, in_kubernetes: bool) -> AgentConfig {
        let api_base_url = self
            .api_url
            .unwrap_or_else(|| resolve_api_base_url(in_kubernetes, self.namespace.as_deref()));

        AgentConfig {
            api_base_url,
            poll_interval: Duration::from_secs(self.poll_interval),
            healthcheck_interval: Duration::from_secs(self.healthcheck_interval),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            attribute_timeout: Duration::from_millis(self.attribute_timeout_ms),
            enumeration_timeout: Duration::from_millis(self.enumeration_timeout_ms),
            usb_init_retry_delay: Duration::from_secs(self.usb_init_retry_delay),
            usb_init_max_attempts: self.usb_init_attempts,
            device_dir: self.device_dir,
            secondary_device_prefix: self.secondary_prefix,
            udevadm_path: self.udevadm,
            usb_ids_path: self.usb_ids,
        }
    }
}
