//! Raw descriptor to canonical peripheral record.
//!
//! The [`Normalizer`] combines a [`UsbDeviceDescriptor`] with the names from
//! the [`UsbIds`] database and the attributes resolved through an
//! [`AttributeResolver`] into a [`Peripheral`]. The record-building step
//! itself, [`build_peripheral`], is pure and deterministic.

use periphery_core::Peripheral;
use periphery_core::constants::INTERFACE_USB;
use tracing::{debug, trace};

use crate::traits::AttributeSource;
use crate::types::UsbDeviceDescriptor;
use crate::udev::AttributeResolver;
use crate::usb_ids::UsbIds;

/// Builds peripheral records from raw descriptors.
#[derive(Debug, Clone)]
pub struct Normalizer<A> {
    ids: UsbIds,
    resolver: AttributeResolver<A>,
}

impl<A: AttributeSource> Normalizer<A> {
    pub fn new(ids: UsbIds, resolver: AttributeResolver<A>) -> Self {
        Self { ids, resolver }
    }

    /// Build the record for one device.
    ///
    /// The serial number is looked up on the device's usbfs node; only when
    /// one is found is the secondary device directory scanned. Lookup
    /// failures leave the corresponding fields unset.
    pub async fn normalize(&self, descriptor: &UsbDeviceDescriptor) -> Peripheral {
        let device_path = descriptor.device_path();

        let serial_number = self.resolver.serial_number(&device_path).await;
        let video_device = match serial_number.as_deref() {
            Some(serial) => self.resolver.secondary_device(serial).await,
            None => None,
        };

        let peripheral = build_peripheral(&self.ids, descriptor, serial_number, video_device);
        debug!(
            identifier = %peripheral.identifier,
            name = %peripheral.name,
            classes = ?peripheral.classes,
            "Normalized USB device"
        );
        peripheral
    }
}

/// Classified class string of every alternate setting, deduplicated by the
/// classified string and kept in first-seen order.
pub fn classify_alt_settings(ids: &UsbIds, descriptor: &UsbDeviceDescriptor) -> Vec<String> {
    let mut classes: Vec<String> = Vec::new();

    for alt in descriptor.alt_settings() {
        trace!(
            setting = alt.setting,
            endpoints = ?alt.endpoints,
            "Inspecting alternate setting"
        );

        let class = ids.classify(alt.class_code, alt.sub_class_code, alt.protocol_code);
        if !classes.contains(&class) {
            classes.push(class);
        }
    }

    classes
}

/// Assemble the canonical record from a descriptor and resolved attributes.
pub fn build_peripheral(
    ids: &UsbIds,
    descriptor: &UsbDeviceDescriptor,
    serial_number: Option<String>,
    video_device: Option<String>,
) -> Peripheral {
    let usb_id = descriptor.usb_id();
    let identifier = usb_id.to_string();

    let vendor = ids.vendor_name(descriptor.vendor_id);
    let product = ids.product_name(descriptor.vendor_id, descriptor.product_id);
    let classes = classify_alt_settings(ids, descriptor);

    // Composite devices declare their classes per interface.
    let protocol = if descriptor.class_code != 0 {
        Some(ids.classify(
            descriptor.class_code,
            descriptor.sub_class_code,
            descriptor.protocol_code,
        ))
    } else {
        classes.first().cloned()
    };

    let name = match product {
        Some(product) => product.to_string(),
        None => usb_id.unnamed_label(),
    };

    let mut peripheral = Peripheral::new(identifier.as_str(), name)
        .with_description(describe(&identifier, product, protocol.as_deref()))
        .with_classes(classes)
        .with_device_path(descriptor.device_path());

    if let Some(vendor) = vendor {
        peripheral = peripheral.with_vendor(vendor);
    }
    if let Some(product) = product {
        peripheral = peripheral.with_product(product);
    }
    if let Some(serial_number) = serial_number {
        peripheral = peripheral.with_serial_number(serial_number);
    }
    if let Some(video_device) = video_device {
        peripheral = peripheral.with_video_device(video_device);
    }

    peripheral
}

fn describe(identifier: &str, product: Option<&str>, protocol: Option<&str>) -> String {
    let mut description = format!("{INTERFACE_USB} {identifier}");
    if let Some(product) = product {
        description.push(' ');
        description.push_str(product);
    }
    if let Some(protocol) = protocol {
        description.push_str(" - ");
        description.push_str(protocol);
    }
    description
}
