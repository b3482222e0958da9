//! Mock USB bus implementation for testing and development.
//!
//! This module provides a simulated USB bus whose attached devices can be
//! plugged and unplugged programmatically between enumerations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    error::{HardwareError, Result},
    traits::UsbBus,
    types::UsbDeviceDescriptor,
};

#[derive(Debug, Default)]
struct BusState {
    devices: Vec<UsbDeviceDescriptor>,
    fail_next: Option<String>,
    enumerations: usize,
}

/// Mock USB bus for testing and development.
///
/// # Examples
///
/// ```
/// use periphery_hardware::mock::MockUsbBus;
/// use periphery_hardware::traits::UsbBus;
/// use periphery_hardware::types::UsbDeviceDescriptor;
///
/// #[tokio::main]
/// async fn main() -> periphery_hardware::Result<()> {
///     let (bus, handle) = MockUsbBus::new();
///
///     handle.plug(UsbDeviceDescriptor::new(1, 4, 0x046d, 0x0825));
///     assert_eq!(bus.enumerate().await?.len(), 1);
///
///     handle.unplug(1, 4);
///     assert!(bus.enumerate().await?.is_empty());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockUsbBus {
    state: Arc<Mutex<BusState>>,
}

impl MockUsbBus {
    /// Create an empty mock bus.
    ///
    /// Returns a tuple of (MockUsbBus, MockUsbBusHandle) where the handle
    /// can be used to change the attached devices.
    pub fn new() -> (Self, MockUsbBusHandle) {
        Self::with_devices(Vec::new())
    }

    /// Create a mock bus with devices already attached.
    pub fn with_devices(devices: Vec<UsbDeviceDescriptor>) -> (Self, MockUsbBusHandle) {
        let state = Arc::new(Mutex::new(BusState {
            devices,
            ..BusState::default()
        }));

        (
            Self {
                state: state.clone(),
            },
            MockUsbBusHandle { state },
        )
    }
}

impl UsbBus for MockUsbBus {
    async fn enumerate(&self) -> Result<Vec<UsbDeviceDescriptor>> {
        let mut state = lock(&self.state);
        state.enumerations += 1;

        if let Some(message) = state.fail_next.take() {
            return Err(HardwareError::enumeration(message));
        }

        Ok(state.devices.clone())
    }
}

/// Handle for controlling a [`MockUsbBus`].
#[derive(Debug, Clone)]
pub struct MockUsbBusHandle {
    state: Arc<Mutex<BusState>>,
}

impl MockUsbBusHandle {
    /// Attach a device.
    pub fn plug(&self, device: UsbDeviceDescriptor) {
        lock(&self.state).devices.push(device);
    }

    /// Detach the device at `bus`/`address`. Returns whether it was attached.
    pub fn unplug(&self, bus: u8, address: u8) -> bool {
        let mut state = lock(&self.state);
        let before = state.devices.len();
        state
            .devices
            .retain(|d| !(d.bus == bus && d.address == address));
        state.devices.len() != before
    }

    /// Make the next enumeration fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        lock(&self.state).fail_next = Some(message.into());
    }

    /// Number of enumerations performed so far.
    pub fn enumerations(&self) -> usize {
        lock(&self.state).enumerations
    }
}

fn lock(state: &Mutex<BusState>) -> MutexGuard<'_, BusState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plug_and_unplug() {
        let (bus, handle) = MockUsbBus::new();
        handle.plug(UsbDeviceDescriptor::new(1, 2, 0x1d6b, 0x0002));
        handle.plug(UsbDeviceDescriptor::new(1, 3, 0x046d, 0x0825));

        assert_eq!(bus.enumerate().await.unwrap().len(), 2);
        assert!(handle.unplug(1, 2));
        assert!(!handle.unplug(1, 2));

        let devices = bus.enumerate().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].vendor_id, 0x046d);
        assert_eq!(handle.enumerations(), 2);
    }

    #[tokio::test]
    async fn test_failure_applies_to_one_enumeration() {
        let (bus, handle) =
            MockUsbBus::with_devices(vec![UsbDeviceDescriptor::new(1, 2, 0x1d6b, 0x0002)]);
        handle.fail_next("LIBUSB_ERROR_IO");

        assert!(matches!(
            bus.enumerate().await,
            Err(HardwareError::Enumeration { .. })
        ));
        assert_eq!(bus.enumerate().await.unwrap().len(), 1);
    }
}
