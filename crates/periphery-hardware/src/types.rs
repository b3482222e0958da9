//! Raw USB descriptor types.
//!
//! These types mirror the descriptor tree reported by the host USB stack:
//! a device holds configurations, each configuration holds interfaces, each
//! interface holds one or more alternate settings, and each alternate setting
//! holds its endpoints. They carry no resolved names; resolution happens in
//! the [`normalizer`](crate::normalizer).

use periphery_core::UsbId;
use periphery_core::constants::USB_DEVICE_ROOT;
use serde::{Deserialize, Serialize};

/// Descriptor of one attached USB device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbDeviceDescriptor {
    /// Bus number the device is attached to.
    pub bus: u8,

    /// Device address on the bus.
    pub address: u8,

    pub vendor_id: u16,

    pub product_id: u16,

    /// Device-level class code (0 when classes are defined per interface).
    pub class_code: u8,

    pub sub_class_code: u8,

    pub protocol_code: u8,

    pub configurations: Vec<ConfigDescriptor>,
}

impl UsbDeviceDescriptor {
    /// Create a descriptor with no configurations and interface-defined class.
    pub fn new(bus: u8, address: u8, vendor_id: u16, product_id: u16) -> Self {
        Self {
            bus,
            address,
            vendor_id,
            product_id,
            class_code: 0,
            sub_class_code: 0,
            protocol_code: 0,
            configurations: Vec::new(),
        }
    }

    /// Set the device-level class triple.
    pub fn with_device_class(mut self, class: u8, sub_class: u8, protocol: u8) -> Self {
        self.class_code = class;
        self.sub_class_code = sub_class;
        self.protocol_code = protocol;
        self
    }

    /// Append a configuration.
    pub fn with_configuration(mut self, configuration: ConfigDescriptor) -> Self {
        self.configurations.push(configuration);
        self
    }

    /// Vendor/product identifier pair.
    pub fn usb_id(&self) -> UsbId {
        UsbId::new(self.vendor_id, self.product_id)
    }

    /// usbfs node of this device, `/dev/bus/usb/BBB/AAA`.
    pub fn device_path(&self) -> String {
        format!("{USB_DEVICE_ROOT}/{:03}/{:03}", self.bus, self.address)
    }

    /// Every alternate setting of every interface of every configuration,
    /// in descriptor order.
    pub fn alt_settings(&self) -> impl Iterator<Item = &AltSetting> {
        self.configurations
            .iter()
            .flat_map(|config| config.interfaces.iter())
            .flat_map(|interface| interface.alt_settings.iter())
    }
}

/// Configuration descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDescriptor {
    pub number: u8,
    pub interfaces: Vec<InterfaceDescriptor>,
}

impl ConfigDescriptor {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            interfaces: Vec::new(),
        }
    }

    pub fn with_interface(mut self, interface: InterfaceDescriptor) -> Self {
        self.interfaces.push(interface);
        self
    }
}

/// Interface descriptor with its alternate settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub number: u8,
    pub alt_settings: Vec<AltSetting>,
}

impl InterfaceDescriptor {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            alt_settings: Vec::new(),
        }
    }

    pub fn with_alt_setting(mut self, alt_setting: AltSetting) -> Self {
        self.alt_settings.push(alt_setting);
        self
    }
}

/// One alternate setting of an interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltSetting {
    pub setting: u8,
    pub class_code: u8,
    pub sub_class_code: u8,
    pub protocol_code: u8,
    pub endpoints: Vec<EndpointDescriptor>,
}

impl AltSetting {
    pub fn new(setting: u8, class_code: u8, sub_class_code: u8, protocol_code: u8) -> Self {
        Self {
            setting,
            class_code,
            sub_class_code,
            protocol_code,
            endpoints: Vec::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: EndpointDescriptor) -> Self {
        self.endpoints.push(endpoint);
        self
    }
}

/// Endpoint descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub address: u8,
    pub direction: EndpointDirection,
    pub transfer_type: TransferType,
    pub max_packet_size: u16,
}

/// Data direction of an endpoint, seen from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointDirection {
    In,
    Out,
}

/// Endpoint transfer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composite() -> UsbDeviceDescriptor {
        UsbDeviceDescriptor::new(1, 4, 0x046d, 0x0825)
            .with_device_class(0xef, 0x02, 0x01)
            .with_configuration(
                ConfigDescriptor::new(1)
                    .with_interface(
                        InterfaceDescriptor::new(0).with_alt_setting(
                            AltSetting::new(0, 0x0e, 0x01, 0x00).with_endpoint(
                                EndpointDescriptor {
                                    address: 0x87,
                                    direction: EndpointDirection::In,
                                    transfer_type: TransferType::Interrupt,
                                    max_packet_size: 16,
                                },
                            ),
                        ),
                    )
                    .with_interface(
                        InterfaceDescriptor::new(1)
                            .with_alt_setting(AltSetting::new(0, 0x0e, 0x02, 0x00))
                            .with_alt_setting(AltSetting::new(1, 0x0e, 0x02, 0x00)),
                    ),
            )
    }

    #[test]
    fn test_device_path_is_zero_padded() {
        let descriptor = UsbDeviceDescriptor::new(1, 4, 0x1d6b, 0x0002);
        assert_eq!(descriptor.device_path(), "/dev/bus/usb/001/004");

        let descriptor = UsbDeviceDescriptor::new(12, 127, 0x1d6b, 0x0002);
        assert_eq!(descriptor.device_path(), "/dev/bus/usb/012/127");
    }

    #[test]
    fn test_usb_id() {
        assert_eq!(composite().usb_id().to_string(), "046d:0825");
    }

    #[test]
    fn test_alt_settings_walks_whole_tree_in_order() {
        let descriptor = composite();
        let settings: Vec<(u8, u8)> = descriptor
            .alt_settings()
            .map(|alt| (alt.sub_class_code, alt.setting))
            .collect();
        assert_eq!(settings, vec![(0x01, 0), (0x02, 0), (0x02, 1)]);
    }

    #[test]
    fn test_descriptor_without_configurations() {
        let descriptor = UsbDeviceDescriptor::new(2, 1, 0x1d6b, 0x0003);
        assert_eq!(descriptor.alt_settings().count(), 0);
    }
}
