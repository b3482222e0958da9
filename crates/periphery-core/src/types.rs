use crate::{
    Result,
    constants::{INTERFACE_USB, UNNAMED_DEVICE_LABEL},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Vendor/product identifier pair of a USB device.
///
/// Displays as the reconciliation key `"vvvv:pppp"` (lowercase, zero-padded
/// hex), e.g. `1d6b:0002`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UsbId {
    vendor: u16,
    product: u16,
}

impl UsbId {
    /// Create a new identifier from raw vendor and product ids.
    #[must_use]
    pub fn new(vendor: u16, product: u16) -> Self {
        Self { vendor, product }
    }

    /// Raw vendor id.
    #[must_use]
    pub fn vendor(&self) -> u16 {
        self.vendor
    }

    /// Raw product id.
    #[must_use]
    pub fn product(&self) -> u16 {
        self.product
    }

    /// Fallback display name for a device whose product name is unknown.
    #[must_use]
    pub fn unnamed_label(&self) -> String {
        format!("{UNNAMED_DEVICE_LABEL} {self}")
    }
}

impl fmt::Display for UsbId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor, self.product)
    }
}

impl std::str::FromStr for UsbId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidIdentifier(s.to_string());

        let (vendor, product) = s.split_once(':').ok_or_else(invalid)?;
        if vendor.is_empty() || product.is_empty() || vendor.len() > 4 || product.len() > 4 {
            return Err(invalid());
        }

        let vendor = u16::from_str_radix(vendor, 16).map_err(|_| invalid())?;
        let product = u16::from_str_radix(product, 16).map_err(|_| invalid())?;
        Ok(UsbId::new(vendor, product))
    }
}

/// Canonical description of one attached USB peripheral.
///
/// Records are rebuilt from scratch on every discovery cycle. Two records are
/// equal when every field is equal; optional fields that were not resolved are
/// `None` and are omitted from the JSON body rather than sent as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Peripheral {
    /// Reconciliation key, `"vendor:product"`.
    #[serde(default)]
    pub identifier: String,

    /// Product name, or a fallback built from the identifier.
    #[serde(default)]
    pub name: String,

    /// Free-text summary of the device.
    #[serde(default)]
    pub description: String,

    /// Interface kind, always `"USB"` for records built by this agent.
    #[serde(default)]
    pub interface: String,

    /// Classified interface classes in first-seen order, without duplicates.
    #[serde(default)]
    pub classes: Vec<String>,

    /// Whether the device is currently attached.
    #[serde(default)]
    pub available: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,

    /// usbfs node of the device, `/dev/bus/usb/BBB/AAA`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,

    /// Secondary node (e.g. `/dev/video0`) sharing this device's serial number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_device: Option<String>,
}

impl Peripheral {
    /// Create an available USB peripheral with the required fields.
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            description: String::new(),
            interface: INTERFACE_USB.to_string(),
            classes: Vec::new(),
            available: true,
            vendor: None,
            product: None,
            device_path: None,
            serial_number: None,
            video_device: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the classified interface classes.
    pub fn with_classes(mut self, classes: Vec<String>) -> Self {
        self.classes = classes;
        self
    }

    /// Set the vendor name. Empty values leave the field unset.
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = non_empty(vendor.into());
        self
    }

    /// Set the product name. Empty values leave the field unset.
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = non_empty(product.into());
        self
    }

    /// Set the device node path. Empty values leave the field unset.
    pub fn with_device_path(mut self, device_path: impl Into<String>) -> Self {
        self.device_path = non_empty(device_path.into());
        self
    }

    /// Set the serial number. Empty values leave the field unset.
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = non_empty(serial_number.into());
        self
    }

    /// Set the associated secondary device node. Empty values leave the field unset.
    pub fn with_video_device(mut self, video_device: impl Into<String>) -> Self {
        self.video_device = non_empty(video_device.into());
        self
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// A peripheral record as stored by the registry.
///
/// The registry adds `id`, `version` and `parent` to every record it stores.
/// These fields belong to the registry: they never take part in equality
/// checks and are never sent back on create or update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePeripheral {
    #[serde(flatten)]
    pub peripheral: Peripheral,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl RemotePeripheral {
    /// Wrap a bare record, without registry metadata.
    pub fn new(peripheral: Peripheral) -> Self {
        Self {
            peripheral,
            id: None,
            version: None,
            parent: None,
        }
    }

    /// Drop the registry-owned fields, keeping the comparable record.
    pub fn strip(self) -> Peripheral {
        self.peripheral
    }

    /// Compare against an observed record, ignoring registry-owned fields.
    pub fn matches(&self, observed: &Peripheral) -> bool {
        self.peripheral == *observed
    }
}

/// Parse the registry's USB peripheral listing.
///
/// The registry answers with a JSON object mapping identifier to record.
/// Records that do not repeat their identifier inherit it from the map key.
///
/// # Errors
/// Returns `Error::InvalidRecord` if the body is not such an object.
pub fn parse_registry_listing(body: &str) -> Result<BTreeMap<String, RemotePeripheral>> {
    let mut listing: BTreeMap<String, RemotePeripheral> = serde_json::from_str(body)?;

    for (key, record) in listing.iter_mut() {
        if record.peripheral.identifier.is_empty() {
            record.peripheral.identifier = key.clone();
        }
    }

    Ok(listing)
}
