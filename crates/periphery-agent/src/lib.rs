//! USB peripheral discovery agent.
//!
//! This crate ties the hardware and network layers together: every cycle it
//! fetches the USB peripherals registered for the node, enumerates the
//! devices actually attached, and converges the registry onto what it sees.
//!
//! ```text
//!  RegistryApi::fetch_usb_peripherals ──┐
//!                                       ├──► reconcile ──► Vec<Operation> ──► RegistryApi
//!  UsbBus::enumerate ──► Normalizer ────┘                  (create/update/delete)
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod reconcile;

pub use agent::{Agent, CycleReport};
pub use cli::Cli;
pub use config::{AgentConfig, resolve_api_base_url};
pub use error::CycleError;
pub use reconcile::{Operation, reconcile};
