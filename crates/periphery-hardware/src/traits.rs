//! Host capability trait definitions.
//!
//! This module defines the two seams between the agent and its host: the USB
//! bus that reports attached devices, and the attribute source that answers
//! udev attribute queries and directory listings. Real implementations live
//! in [`rusb_bus`](crate::rusb_bus) and [`udev`](crate::udev); scriptable
//! ones in [`mock`](crate::mock).
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use std::path::Path;

use crate::error::Result;
use crate::types::UsbDeviceDescriptor;

/// Source of the currently attached USB devices.
///
/// # Object Safety
///
/// This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic type parameters:
///
/// ```no_run
/// use periphery_hardware::traits::UsbBus;
/// use periphery_hardware::error::Result;
///
/// async fn count_devices<B: UsbBus>(bus: &B) -> Result<usize> {
///     Ok(bus.enumerate().await?.len())
/// }
/// ```
pub trait UsbBus: Send + Sync {
    /// List the descriptors of every device currently visible to the host.
    ///
    /// A device whose descriptors cannot be read is left out of the result
    /// rather than failing the whole listing.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The device list cannot be obtained
    /// - The enumeration times out
    async fn enumerate(&self) -> Result<Vec<UsbDeviceDescriptor>>;
}

/// Source of device attributes and device-node directory listings.
pub trait AttributeSource: Send + Sync {
    /// Return the attribute walk text for a device node, in
    /// `udevadm info --attribute-walk` format.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be run, fails, or times out.
    async fn query_attributes(&self, node: &str) -> Result<String>;

    /// Return the entry names of a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    async fn list_dir(&self, dir: &Path) -> Result<Vec<String>>;
}
