//! Device attribute resolution through udev.
//!
//! Serial numbers are read from the output of
//! `udevadm info --attribute-walk --name=<node>`, which prints the attributes
//! of the node's device followed by those of every parent device:
//!
//! ```text
//!   looking at device '/devices/platform/soc/fe980000.usb/usb1/1-1/1-1.3':
//!     KERNEL=="1-1.3"
//!     ATTR{idVendor}=="046d"
//!     ATTR{serial}=="9F2C1A70"
//!
//!   looking at parent device '/devices/platform/soc/fe980000.usb/usb1':
//!     KERNELS=="usb1"
//!     ATTRS{serial}=="fe980000.usb"
//! ```
//!
//! Only two blocks may supply the serial of a USB device node: its own
//! leading block and, as a fallback, the bus controller block whose path ends
//! in `.usb`. Hubs and root hubs further up report serials of their own (a
//! root hub reports its controller address) and are skipped, so two devices
//! without a serial never resolve to the same value. A class node such as
//! `/dev/video0` takes the serial of the USB device it belongs to.

use std::path::{Path, PathBuf};
use std::time::Duration;

use periphery_core::constants::{PARENT_BUS_SUFFIX, SERIAL_ATTRIBUTE};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{HardwareError, Result};
use crate::traits::AttributeSource;

/// Attribute source running `udevadm` and reading the local filesystem.
#[derive(Debug, Clone)]
pub struct UdevAttributes {
    udevadm: PathBuf,
    timeout: Duration,
}

impl UdevAttributes {
    /// Create a source using the given `udevadm` binary and per-query timeout.
    pub fn new(udevadm: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            udevadm: udevadm.into(),
            timeout,
        }
    }
}

impl AttributeSource for UdevAttributes {
    async fn query_attributes(&self, node: &str) -> Result<String> {
        let mut command = Command::new(&self.udevadm);
        command
            .arg("info")
            .arg("--attribute-walk")
            .arg(format!("--name={node}"))
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| HardwareError::timeout("udevadm info", self.timeout.as_millis() as u64))?
            .map_err(|e| HardwareError::attribute_query(node, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HardwareError::attribute_query(
                node,
                format!("udevadm exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn list_dir(&self, dir: &Path) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

/// Resolves serial numbers and secondary device nodes for a device.
#[derive(Debug, Clone)]
pub struct AttributeResolver<A> {
    source: A,
    device_dir: PathBuf,
    secondary_prefix: String,
}

impl<A: AttributeSource> AttributeResolver<A> {
    /// Create a resolver scanning `device_dir` for entries named
    /// `<secondary_prefix>*` (e.g. `/dev/video*`).
    pub fn new(
        source: A,
        device_dir: impl Into<PathBuf>,
        secondary_prefix: impl Into<String>,
    ) -> Self {
        Self {
            source,
            device_dir: device_dir.into(),
            secondary_prefix: secondary_prefix.into(),
        }
    }

    /// Underlying attribute source.
    pub fn source(&self) -> &A {
        &self.source
    }

    /// Serial number of a device node.
    ///
    /// A failed attribute query is not an error for the caller: it is logged
    /// and reported as an unknown serial number.
    pub async fn serial_number(&self, node: &str) -> Option<String> {
        match self.source.query_attributes(node).await {
            Ok(walk) => {
                let serial = parse_serial(&walk);
                trace!(node, serial = ?serial, "Resolved serial number");
                serial
            }
            Err(e) => {
                debug!(node, "Cannot query device attributes: {}", e);
                None
            }
        }
    }

    /// First secondary device node whose serial number equals `serial`.
    ///
    /// Candidates are visited in natural name order (`video2` before
    /// `video10`). Returns `None` when nothing matches or the directory
    /// cannot be listed.
    pub async fn secondary_device(&self, serial: &str) -> Option<String> {
        let mut names = match self.source.list_dir(&self.device_dir).await {
            Ok(names) => names,
            Err(e) => {
                debug!(dir = %self.device_dir.display(), "Cannot list device directory: {}", e);
                return None;
            }
        };

        names.retain(|name| name.starts_with(&self.secondary_prefix));
        names.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        for name in names {
            let node = self.device_dir.join(&name).to_string_lossy().into_owned();
            if self.serial_number(&node).await.as_deref() == Some(serial) {
                debug!(node, serial, "Associated secondary device");
                return Some(node);
            }
        }

        None
    }
}

/// One `looking at ...` section of an attribute walk.
#[derive(Debug, Default)]
struct WalkBlock<'a> {
    path: &'a str,
    serial: Option<String>,
    usb_device: bool,
}

impl WalkBlock<'_> {
    /// Root hubs are named `usb<N>` and report their controller's address
    /// as serial number.
    fn is_root_hub(&self) -> bool {
        let name = self.path.rsplit('/').next().unwrap_or_default();
        name.strip_prefix("usb")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    }

    fn is_bus_controller(&self) -> bool {
        self.path.ends_with(PARENT_BUS_SUFFIX)
    }
}

/// Split an attribute walk into its blocks, leading device block first.
fn walk_blocks(walk: &str) -> Vec<WalkBlock<'_>> {
    let mut blocks: Vec<WalkBlock<'_>> = Vec::new();

    for line in walk.lines() {
        let line = line.trim();

        if let Some(path) = header_path(line) {
            blocks.push(WalkBlock {
                path,
                ..WalkBlock::default()
            });
            continue;
        }

        let Some(block) = blocks.last_mut() else {
            continue;
        };

        if let Some(name) = attribute_name(line) {
            if USB_DEVICE_ATTRIBUTES.contains(&name) {
                block.usb_device = true;
            }
            if name == SERIAL_ATTRIBUTE && block.serial.is_none() {
                block.serial = serial_value(line);
            }
        }
    }

    blocks
}

/// Attributes only USB device blocks carry (interfaces and class nodes don't).
const USB_DEVICE_ATTRIBUTES: &[&str] = &["idVendor", "busnum"];

/// Extract the serial number of the walked node.
///
/// - The `serial` of the leading device block wins.
/// - A class node (e.g. `/dev/video0`) takes the serial of its nearest USB
///   device ancestor. Root hubs never lend theirs, and the lookup stops at
///   that ancestor.
/// - A USB device node without its own serial falls back to the bus
///   controller block (path ending in `.usb`).
///
/// All other parent blocks are ignored. Empty values count as absent.
///
/// # Examples
///
/// ```
/// use periphery_hardware::udev::parse_serial;
///
/// let walk = "\
///   looking at device '/devices/platform/soc/fe980000.usb/usb1/1-1':
///     ATTR{idVendor}==\"046d\"
///     ATTR{serial}==\"ABC123\"
///   looking at parent device '/devices/platform/soc/fe980000.usb/usb1':
///     ATTRS{serial}==\"fe980000.usb\"
/// ";
/// assert_eq!(parse_serial(walk), Some("ABC123".to_string()));
/// ```
pub fn parse_serial(walk: &str) -> Option<String> {
    let blocks = walk_blocks(walk);
    let (leading, parents) = blocks.split_first()?;

    if leading.serial.is_some() {
        return leading.serial.clone();
    }

    if !leading.usb_device {
        let owner = parents.iter().find(|block| block.usb_device)?;
        return if owner.is_root_hub() {
            None
        } else {
            owner.serial.clone()
        };
    }

    parents
        .iter()
        .filter(|block| block.is_bus_controller())
        .find_map(|block| block.serial.clone())
}

/// Path of a `looking at [parent ]device '<path>':` header line.
fn header_path(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix("looking at device")
        .or_else(|| line.strip_prefix("looking at parent device"))?;
    Some(rest.trim().trim_end_matches(':').trim_matches('\''))
}

/// Name of an `ATTR{<name>}==` / `ATTRS{<name>}==` line.
fn attribute_name(line: &str) -> Option<&str> {
    let (key, _) = line.split_once("==")?;
    let key = key.trim();
    key.strip_prefix("ATTRS{")
        .or_else(|| key.strip_prefix("ATTR{"))?
        .strip_suffix('}')
}

/// Value of an `ATTR{serial}==` / `ATTRS{serial}==` line.
fn serial_value(line: &str) -> Option<String> {
    if attribute_name(line)? != SERIAL_ATTRIBUTE {
        return None;
    }

    let (_, value) = line.split_once("==")?;
    let value = value.trim().trim_matches('"').trim();
    (!value.is_empty()).then(|| value.to_string())
}
