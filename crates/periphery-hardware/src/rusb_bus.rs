//! libusb-backed device enumeration.
//!
//! [`RusbBus`] reads the descriptor tree of every attached device through
//! `rusb`. libusb calls block, so each enumeration runs on Tokio's blocking
//! pool and is bounded by a timeout.
//!
//! # Initialization
//!
//! A libusb context cannot be created on hosts without a usable USB stack
//! (missing `/dev/bus/usb`, unsupported kernel, container without device
//! access). [`RusbBus::connect`] retries context creation with a fixed
//! backoff and gives up with [`HardwareError::SubsystemUnavailable`] once the
//! attempts are exhausted.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rusb::UsbContext;
use tracing::{debug, info, warn};

use crate::error::{HardwareError, Result};
use crate::traits::UsbBus;
use crate::types::{
    AltSetting, ConfigDescriptor, EndpointDescriptor, EndpointDirection, InterfaceDescriptor,
    TransferType, UsbDeviceDescriptor,
};

/// Retry policy for USB subsystem initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitRetry {
    /// Pause between two attempts.
    pub delay: Duration,

    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
}

/// Run `init` until it succeeds or `retry.max_attempts` attempts failed.
///
/// # Errors
///
/// Returns `HardwareError::SubsystemUnavailable` carrying the last failure.
pub async fn init_with_retry<T, E, F, Fut>(retry: InitRetry, mut init: F) -> Result<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let attempts = retry.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match init().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(attempt, "USB subsystem initialized after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                last_error = e.to_string();
                warn!(
                    attempt,
                    max_attempts = attempts,
                    "USB subsystem initialization failed: {}",
                    last_error
                );
            }
        }

        if attempt < attempts {
            tokio::time::sleep(retry.delay).await;
        }
    }

    Err(HardwareError::subsystem_unavailable(attempts, last_error))
}

/// USB bus backed by a libusb context.
#[derive(Debug)]
pub struct RusbBus {
    context: rusb::Context,
    timeout: Duration,
}

impl RusbBus {
    /// Create the libusb context, retrying per `retry`.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::SubsystemUnavailable` when every attempt fails.
    pub async fn connect(retry: InitRetry, timeout: Duration) -> Result<Self> {
        let context = init_with_retry(retry, || async {
            tokio::task::spawn_blocking(rusb::Context::new)
                .await
                .map_err(|e| e.to_string())?
                .map_err(|e| e.to_string())
        })
        .await?;

        debug!(timeout_ms = timeout.as_millis() as u64, "USB context ready");
        Ok(Self { context, timeout })
    }
}

impl UsbBus for RusbBus {
    async fn enumerate(&self) -> Result<Vec<UsbDeviceDescriptor>> {
        let context = self.context.clone();
        let task = tokio::task::spawn_blocking(move || read_descriptors(&context));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(HardwareError::enumeration(format!(
                "enumeration task failed: {e}"
            ))),
            Err(_) => Err(HardwareError::timeout(
                "USB enumeration",
                self.timeout.as_millis() as u64,
            )),
        }
    }
}

fn read_descriptors<T: UsbContext>(context: &T) -> Result<Vec<UsbDeviceDescriptor>> {
    let devices = context
        .devices()
        .map_err(|e| HardwareError::enumeration(e.to_string()))?;

    let mut descriptors = Vec::with_capacity(devices.len());
    for device in devices.iter() {
        match describe(&device) {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(e) => warn!(
                bus = device.bus_number(),
                address = device.address(),
                "Skipping device with unreadable descriptors: {}",
                e
            ),
        }
    }

    Ok(descriptors)
}

fn describe<T: UsbContext>(device: &rusb::Device<T>) -> rusb::Result<UsbDeviceDescriptor> {
    let device_desc = device.device_descriptor()?;

    let mut descriptor = UsbDeviceDescriptor::new(
        device.bus_number(),
        device.address(),
        device_desc.vendor_id(),
        device_desc.product_id(),
    )
    .with_device_class(
        device_desc.class_code(),
        device_desc.sub_class_code(),
        device_desc.protocol_code(),
    );

    for index in 0..device_desc.num_configurations() {
        let config = device.config_descriptor(index)?;
        let mut configuration = ConfigDescriptor::new(config.number());

        for interface in config.interfaces() {
            let mut iface = InterfaceDescriptor::new(interface.number());
            for alt in interface.descriptors() {
                let mut setting = AltSetting::new(
                    alt.setting_number(),
                    alt.class_code(),
                    alt.sub_class_code(),
                    alt.protocol_code(),
                );
                for endpoint in alt.endpoint_descriptors() {
                    setting = setting.with_endpoint(EndpointDescriptor {
                        address: endpoint.address(),
                        direction: match endpoint.direction() {
                            rusb::Direction::In => EndpointDirection::In,
                            rusb::Direction::Out => EndpointDirection::Out,
                        },
                        transfer_type: match endpoint.transfer_type() {
                            rusb::TransferType::Control => TransferType::Control,
                            rusb::TransferType::Isochronous => TransferType::Isochronous,
                            rusb::TransferType::Bulk => TransferType::Bulk,
                            rusb::TransferType::Interrupt => TransferType::Interrupt,
                        },
                        max_packet_size: endpoint.max_packet_size(),
                    });
                }
                iface = iface.with_alt_setting(setting);
            }
            configuration = configuration.with_interface(iface);
        }

        descriptor = descriptor.with_configuration(configuration);
    }

    Ok(descriptor)
}
