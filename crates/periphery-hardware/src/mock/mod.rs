//! Mock host capabilities for testing and development.
//!
//! This module provides a scriptable USB bus and attribute source that can be
//! controlled programmatically without requiring physical hardware or udev.

pub mod attributes;
pub mod bus;

// Re-export commonly used types
pub use attributes::MockAttributes;
pub use bus::{MockUsbBus, MockUsbBusHandle};
