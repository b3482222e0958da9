//! Core constants for the periphery discovery agent.
//!
//! This module collects the fixed values shared by the enumeration,
//! normalization and registry layers: record labels, registry API paths,
//! host device locations and the default timing of the poll loop.
//!
//! # Registry API
//!
//! The node's management API is reached under a base URL such as
//! `http://localhost:5080/api`. All paths below are relative to it:
//!
//! | Path | Method | Purpose |
//! |------|--------|---------|
//! | `/healthcheck` | GET | Readiness gate before the first cycle |
//! | `/peripheral?parameter=interface&value=USB` | GET | Registered USB peripherals |
//! | `/peripheral` | POST | Register a new peripheral |
//! | `/peripheral/{identifier}` | PUT / DELETE | Update or remove a peripheral |
//!
//! # Usage
//!
//! ```
//! use periphery_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(INTERFACE_USB, "USB");
//!
//! let interval = Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS);
//! assert_eq!(interval.as_secs(), 30);
//! ```

// ============================================================================
// Record Labels
// ============================================================================

/// Interface kind reported for every peripheral managed by this agent.
pub const INTERFACE_USB: &str = "USB";

/// Label used to build a name for devices whose product name is unknown.
///
/// The fallback name is `"<label> <identifier>"`, e.g.
/// `"UNNAMED USB Device 1d6b:0002"`.
pub const UNNAMED_DEVICE_LABEL: &str = "UNNAMED USB Device";

// ============================================================================
// Registry API
// ============================================================================

/// Health check path polled until the agent API answers HTTP 200.
pub const HEALTHCHECK_PATH: &str = "/healthcheck";

/// Peripheral collection path.
pub const PERIPHERAL_PATH: &str = "/peripheral";

/// Query parameter name used to filter the peripheral collection.
pub const FILTER_PARAMETER: &str = "interface";

/// Agent API address used outside of Kubernetes.
pub const LOCAL_AGENT_ADDRESS: &str = "localhost:5080";

/// Namespace assumed when `MY_NAMESPACE` is not set.
pub const DEFAULT_NAMESPACE: &str = "nuvlabox";

// ============================================================================
// Host Device Layout
// ============================================================================

/// Root of the usbfs device nodes (`/dev/bus/usb/BBB/AAA`).
pub const USB_DEVICE_ROOT: &str = "/dev/bus/usb";

/// Directory scanned for secondary device nodes.
pub const DEFAULT_DEVICE_DIR: &str = "/dev";

/// Name prefix of secondary device nodes associated by serial number.
pub const DEFAULT_SECONDARY_DEVICE_PREFIX: &str = "video";

/// Suffix identifying the parent bus controller in a udev attribute walk.
///
/// Platform USB controllers appear as e.g. `/devices/platform/soc/fe980000.usb`.
pub const PARENT_BUS_SUFFIX: &str = ".usb";

/// Attribute carrying a device serial number.
pub const SERIAL_ATTRIBUTE: &str = "serial";

/// Well-known locations of the `usb.ids` database, searched in order.
pub const USB_IDS_SEARCH_PATHS: &[&str] = &[
    "/usr/share/hwdata/usb.ids",
    "/usr/share/misc/usb.ids",
    "/usr/share/usb.ids",
    "/var/lib/usbutils/usb.ids",
];

// ============================================================================
// Timing
// ============================================================================

/// Pause between two discovery cycles (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Pause between two health check probes (seconds).
pub const DEFAULT_HEALTHCHECK_INTERVAL_SECS: u64 = 3;

/// Delay between attempts to initialize the USB subsystem (seconds).
pub const DEFAULT_USB_INIT_RETRY_DELAY_SECS: u64 = 10;

/// Attempts to initialize the USB subsystem before giving up.
pub const DEFAULT_USB_INIT_MAX_ATTEMPTS: u32 = 6;

/// Upper bound for a single registry HTTP call (milliseconds).
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Upper bound for a single attribute query (milliseconds).
pub const DEFAULT_ATTRIBUTE_TIMEOUT_MS: u64 = 5_000;

/// Upper bound for one full device enumeration (milliseconds).
pub const DEFAULT_ENUMERATION_TIMEOUT_MS: u64 = 15_000;
