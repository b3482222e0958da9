//! USB ID database and class classification.
//!
//! Vendor, product and class names come from the `usb.ids` database shipped
//! with usbutils/hwdata. The file is a line-oriented, tab-indented text format:
//!
//! ```text
//! # comment
//! 046d  Logitech, Inc.
//! 	0825  Webcam C270
//! C 0e  Video
//! 	01  Video Control
//! 	02  Video Streaming
//! C 03  Human Interface Device
//! 	01  Boot Interface Subclass
//! 		01  Keyboard
//! ```
//!
//! Vendor blocks nest products; `C` blocks nest subclasses, which nest
//! protocols. All other sections (audio terminals, HID usages, languages...)
//! are skipped. When no database is installed, the base class names defined
//! by the USB-IF are still known, so classification degrades gracefully.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use periphery_core::constants::USB_IDS_SEARCH_PATHS;
use tracing::{debug, info, warn};

use crate::error::Result;

/// USB-IF base class codes and their `usb.ids` names.
const BASE_CLASSES: &[(u8, &str)] = &[
    (0x00, "(Defined at Interface level)"),
    (0x01, "Audio"),
    (0x02, "Communications"),
    (0x03, "Human Interface Device"),
    (0x05, "Physical Interface Device"),
    (0x06, "Imaging"),
    (0x07, "Printer"),
    (0x08, "Mass Storage"),
    (0x09, "Hub"),
    (0x0a, "CDC Data"),
    (0x0b, "Chip/SmartCard"),
    (0x0d, "Content Security"),
    (0x0e, "Video"),
    (0x0f, "Personal Healthcare"),
    (0x10, "Audio/Video"),
    (0x11, "Billboard"),
    (0x12, "USB Type-C Bridge"),
    (0xdc, "Diagnostic"),
    (0xe0, "Wireless"),
    (0xef, "Miscellaneous Device"),
    (0xfe, "Application Specific Interface"),
    (0xff, "Vendor Specific Class"),
];

#[derive(Debug, Clone, Default)]
struct Vendor {
    name: String,
    products: HashMap<u16, String>,
}

#[derive(Debug, Clone, Default)]
struct Class {
    name: String,
    subclasses: HashMap<u8, Subclass>,
}

#[derive(Debug, Clone, Default)]
struct Subclass {
    name: String,
    protocols: HashMap<u8, String>,
}

/// Parser position inside the database.
#[derive(Debug, Clone, Copy)]
enum Section {
    None,
    Vendor(u16),
    Class(u8, Option<u8>),
    Other,
}

/// In-memory `usb.ids` database.
///
/// # Examples
///
/// ```
/// use periphery_hardware::usb_ids::UsbIds;
///
/// let ids = UsbIds::parse("046d  Logitech, Inc.\n\t0825  Webcam C270\n");
/// assert_eq!(ids.vendor_name(0x046d), Some("Logitech, Inc."));
/// assert_eq!(ids.product_name(0x046d, 0x0825), Some("Webcam C270"));
///
/// // Base class names are known even without a database.
/// assert_eq!(UsbIds::empty().classify(0x08, 0x06, 0x50), "Mass Storage");
/// ```
#[derive(Debug, Clone, Default)]
pub struct UsbIds {
    vendors: HashMap<u16, Vendor>,
    classes: HashMap<u8, Class>,
}

impl UsbIds {
    /// Database with no entries; only built-in base class names resolve.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse database text. Malformed lines are skipped.
    pub fn parse(text: &str) -> Self {
        let mut ids = Self::default();
        let mut section = Section::None;

        for line in text.lines() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(entry) = line.strip_prefix("\t\t") {
                if let Section::Class(class, Some(subclass)) = section
                    && let Some((code, name)) = split_entry(entry, 2)
                    && let Ok(protocol) = u8::from_str_radix(code, 16)
                    && let Some(sub) = ids
                        .classes
                        .get_mut(&class)
                        .and_then(|c| c.subclasses.get_mut(&subclass))
                {
                    sub.protocols.insert(protocol, name.to_string());
                }
                continue;
            }

            if let Some(entry) = line.strip_prefix('\t') {
                match section {
                    Section::Vendor(vendor) => {
                        if let Some((code, name)) = split_entry(entry, 4)
                            && let Ok(product) = u16::from_str_radix(code, 16)
                            && let Some(v) = ids.vendors.get_mut(&vendor)
                        {
                            v.products.insert(product, name.to_string());
                        }
                    }
                    Section::Class(class, _) => {
                        if let Some((code, name)) = split_entry(entry, 2)
                            && let Ok(subclass) = u8::from_str_radix(code, 16)
                            && let Some(c) = ids.classes.get_mut(&class)
                        {
                            c.subclasses.insert(
                                subclass,
                                Subclass {
                                    name: name.to_string(),
                                    protocols: HashMap::new(),
                                },
                            );
                            section = Section::Class(class, Some(subclass));
                        }
                    }
                    Section::None | Section::Other => {}
                }
                continue;
            }

            section = if let Some(entry) = line.strip_prefix("C ") {
                match split_entry(entry, 2).and_then(|(code, name)| {
                    u8::from_str_radix(code, 16).ok().map(|class| (class, name))
                }) {
                    Some((class, name)) => {
                        ids.classes.insert(
                            class,
                            Class {
                                name: name.to_string(),
                                subclasses: HashMap::new(),
                            },
                        );
                        Section::Class(class, None)
                    }
                    None => Section::Other,
                }
            } else {
                match split_entry(line, 4).and_then(|(code, name)| {
                    u16::from_str_radix(code, 16).ok().map(|vendor| (vendor, name))
                }) {
                    Some((vendor, name)) => {
                        ids.vendors.insert(
                            vendor,
                            Vendor {
                                name: name.to_string(),
                                products: HashMap::new(),
                            },
                        );
                        Section::Vendor(vendor)
                    }
                    None => Section::Other,
                }
            };
        }

        ids
    }

    /// Load and parse a database file.
    ///
    /// The file is read as bytes and decoded lossily; published databases
    /// contain a few non-UTF-8 vendor names.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    /// Load the database from `explicit` if given, else from the first
    /// well-known location that exists. Falls back to an empty database.
    pub fn discover(explicit: Option<&Path>) -> Self {
        let candidates: Vec<PathBuf> = match explicit {
            Some(path) => vec![path.to_path_buf()],
            None => USB_IDS_SEARCH_PATHS.iter().map(PathBuf::from).collect(),
        };

        for path in candidates {
            if explicit.is_none() && !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(ids) => {
                    info!(
                        path = %path.display(),
                        vendors = ids.vendors.len(),
                        classes = ids.classes.len(),
                        "Loaded USB ID database"
                    );
                    return ids;
                }
                Err(e) => warn!(path = %path.display(), "Cannot read USB ID database: {}", e),
            }
        }

        debug!("No USB ID database available, using built-in class names only");
        Self::empty()
    }

    /// Number of vendors in the database.
    pub fn vendor_count(&self) -> usize {
        self.vendors.len()
    }

    /// Vendor display name.
    pub fn vendor_name(&self, vendor: u16) -> Option<&str> {
        self.vendors.get(&vendor).map(|v| v.name.as_str())
    }

    /// Product display name.
    pub fn product_name(&self, vendor: u16, product: u16) -> Option<&str> {
        self.vendors
            .get(&vendor)
            .and_then(|v| v.products.get(&product))
            .map(String::as_str)
    }

    /// Classify a class/subclass/protocol triple into a display string.
    ///
    /// - `"<Class> (<Subclass>) <Protocol>"` when all three are known
    /// - `"<Class> (<Subclass>)"` when class and subclass are known
    /// - `"<Class>"` when only the class is known
    /// - `"Unknown cc.ss.pp"` otherwise
    pub fn classify(&self, class: u8, sub_class: u8, protocol: u8) -> String {
        let Some(class_name) = self.class_name(class) else {
            return format!("Unknown {class:02x}.{sub_class:02x}.{protocol:02x}");
        };

        let Some(subclass) = self
            .classes
            .get(&class)
            .and_then(|c| c.subclasses.get(&sub_class))
        else {
            return class_name.to_string();
        };

        match subclass.protocols.get(&protocol) {
            Some(protocol_name) => format!("{class_name} ({}) {protocol_name}", subclass.name),
            None => format!("{class_name} ({})", subclass.name),
        }
    }

    fn class_name(&self, class: u8) -> Option<&str> {
        self.classes
            .get(&class)
            .map(|c| c.name.as_str())
            .or_else(|| {
                BASE_CLASSES
                    .iter()
                    .find(|(code, _)| *code == class)
                    .map(|(_, name)| *name)
            })
    }
}

/// Split `"<hex code>  <name>"`, checking the code width.
fn split_entry(entry: &str, width: usize) -> Option<(&str, &str)> {
    let (code, name) = entry.split_once(char::is_whitespace)?;
    if code.len() != width || !code.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((code, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    const SAMPLE: &str = "\
#
#	List of USB ID's
#
# Syntax:
# vendor  vendor_name
#	device  device_name				<-- single tab
#		interface  interface_name		<-- two tabs

1d6b  Linux Foundation
	0001  1.1 root hub
	0002  2.0 root hub
	0003  3.0 root hub
046d  Logitech, Inc.
	0825  Webcam C270
	c52b  Unifying Receiver
		0000  Interface zero
0bda  Realtek Semiconductor Corp.

# List of known device classes, subclasses and protocols
C 00  (Defined at Interface level)
C 03  Human Interface Device
	00  No Subclass
	01  Boot Interface Subclass
		01  Keyboard
		02  Mouse
C 09  Hub
	00  Unused
		00  Full speed (or root) hub
		03  TT per port
C 0e  Video
	01  Video Control
	02  Video Streaming

# List of Audio Class Terminal Types
AT 0100  USB Undefined
AT 0101  USB Streaming

# HID Descriptor bCountryCode
HCC 00  Not supported
";

    fn sample() -> UsbIds {
        UsbIds::parse(SAMPLE)
    }

    #[test]
    fn test_vendor_and_product_lookup() {
        let ids = sample();
        assert_eq!(ids.vendor_count(), 3);
        assert_eq!(ids.vendor_name(0x1d6b), Some("Linux Foundation"));
        assert_eq!(ids.product_name(0x1d6b, 0x0002), Some("2.0 root hub"));
        assert_eq!(ids.product_name(0x046d, 0xc52b), Some("Unifying Receiver"));
        assert_eq!(ids.vendor_name(0x0bda), Some("Realtek Semiconductor Corp."));
        assert_eq!(ids.product_name(0x0bda, 0x8153), None);
        assert_eq!(ids.vendor_name(0xdead), None);
    }

    #[test]
    fn test_interface_lines_do_not_become_products() {
        let ids = sample();
        assert_eq!(ids.product_name(0x046d, 0x0000), None);
    }

    #[test]
    fn test_other_sections_are_skipped() {
        let ids = sample();
        // "AT 0100" must not be mistaken for a vendor.
        assert_eq!(ids.vendor_name(0x0100), None);
        assert_eq!(ids.classify(0x09, 0x00, 0x03), "Hub (Unused) TT per port");
    }

    #[rstest]
    #[case(0x03, 0x01, 0x01, "Human Interface Device (Boot Interface Subclass) Keyboard")]
    #[case(0x03, 0x01, 0x07, "Human Interface Device (Boot Interface Subclass)")]
    #[case(0x03, 0x05, 0x00, "Human Interface Device")]
    #[case(0x0e, 0x02, 0x00, "Video (Video Streaming)")]
    #[case(0x08, 0x06, 0x50, "Mass Storage")]
    #[case(0x42, 0x01, 0x02, "Unknown 42.01.02")]
    fn test_classify(
        #[case] class: u8,
        #[case] sub_class: u8,
        #[case] protocol: u8,
        #[case] expected: &str,
    ) {
        assert_eq!(sample().classify(class, sub_class, protocol), expected);
    }

    #[rstest]
    #[case(0x01, "Audio")]
    #[case(0x09, "Hub")]
    #[case(0xff, "Vendor Specific Class")]
    #[case(0x04, "Unknown 04.00.00")]
    fn test_classify_without_database(#[case] class: u8, #[case] expected: &str) {
        assert_eq!(UsbIds::empty().classify(class, 0, 0), expected);
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let ids = UsbIds::parse("zzzz  Not a vendor\n\t0001  orphan\n12  short\n");
        assert_eq!(ids.vendor_count(), 0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        // A latin-1 vendor name must not prevent loading.
        file.write_all(b"1234  Soci\xe9t\xe9\n").unwrap();

        let ids = UsbIds::load(file.path()).unwrap();
        assert_eq!(ids.vendor_name(0x1d6b), Some("Linux Foundation"));
        assert!(ids.vendor_name(0x1234).is_some());
    }

    #[test]
    fn test_discover_explicit_missing_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ids = UsbIds::discover(Some(&dir.path().join("missing.ids")));
        assert_eq!(ids.vendor_count(), 0);
        assert_eq!(ids.classify(0x0e, 0x01, 0x00), "Video");
    }

    #[test]
    fn test_discover_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let ids = UsbIds::discover(Some(file.path()));
        assert_eq!(ids.product_name(0x046d, 0x0825), Some("Webcam C270"));
    }
}
