//! Shared records and constants for the periphery USB discovery agent.
//!
//! The [`Peripheral`] record is the canonical, comparable description of one
//! attached USB device for a single discovery cycle. [`RemotePeripheral`] is
//! the same record as stored by the node's peripheral registry, carrying the
//! registry-owned `id`, `version` and `parent` fields.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
