//! Host USB discovery layer for the periphery agent.
//!
//! This crate turns what the host knows about its attached USB devices into
//! canonical [`Peripheral`](periphery_core::Peripheral) records. It defines
//! trait-based abstractions for the two host capabilities it needs, so the
//! real implementations can be swapped for mocks in tests.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All host operations are asynchronous using native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Bounded**: Every blocking host call runs with a timeout.
//! - **Forgiving**: Only a USB subsystem that cannot be initialized at all is
//!   fatal; a device or attribute that cannot be read is skipped or left out.
//!
//! # Pipeline
//!
//! ```text
//! UsbBus::enumerate ──► UsbDeviceDescriptor ──► Normalizer ──► Peripheral
//!                                                  │
//!                                    ┌─────────────┴─────────────┐
//!                                  UsbIds               AttributeResolver
//!                             (names, classes)      (serial, video device)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use periphery_hardware::{
//!     AttributeResolver, InitRetry, Normalizer, RusbBus, UdevAttributes, UsbBus, UsbIds,
//! };
//!
//! # async fn example() -> periphery_hardware::Result<()> {
//! let retry = InitRetry { delay: Duration::from_secs(10), max_attempts: 6 };
//! let bus = RusbBus::connect(retry, Duration::from_secs(15)).await?;
//!
//! let attributes = UdevAttributes::new("udevadm", Duration::from_secs(5));
//! let normalizer = Normalizer::new(
//!     UsbIds::discover(None),
//!     AttributeResolver::new(attributes, "/dev", "video"),
//! );
//!
//! for descriptor in bus.enumerate().await? {
//!     let peripheral = normalizer.normalize(&descriptor).await;
//!     println!("{} {}", peripheral.identifier, peripheral.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod mock;
pub mod normalizer;
pub mod rusb_bus;
pub mod traits;
pub mod types;
pub mod udev;
pub mod usb_ids;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use normalizer::{Normalizer, build_peripheral, classify_alt_settings};
pub use rusb_bus::{InitRetry, RusbBus, init_with_retry};
pub use traits::{AttributeSource, UsbBus};
pub use types::{
    AltSetting, ConfigDescriptor, EndpointDescriptor, EndpointDirection, InterfaceDescriptor,
    TransferType, UsbDeviceDescriptor,
};
pub use udev::{AttributeResolver, UdevAttributes, parse_serial};
pub use usb_ids::UsbIds;
