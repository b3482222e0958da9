//! Registry communication layer for the periphery agent
//!
//! This crate provides the HTTP client the agent uses to talk to the node's
//! peripheral registry. It lists the USB peripherals already registered and
//! creates, updates or deletes individual records.
//!
//! # Components
//!
//! - **RegistryApi**: The operations the agent needs from a registry
//! - **RegistryClient**: `reqwest`-based implementation over the management API
//!
//! # Example
//!
//! ```no_run
//! use periphery_network::{RegistryApi, RegistryClient, RegistryClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RegistryClient::new(RegistryClientConfig::default())?;
//! if client.is_healthy().await {
//!     let registered = client.fetch_usb_peripherals().await?;
//!     println!("{} USB peripherals registered", registered.len());
//! }
//! # Ok(())
//! # }
//! ```

mod client;

pub use client::{RegistryApi, RegistryClient, RegistryClientConfig, RegistryError};
