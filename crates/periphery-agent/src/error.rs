use periphery_hardware::HardwareError;
use periphery_network::RegistryError;
use thiserror::Error;

/// Reasons a discovery cycle is abandoned before reconciling.
///
/// Neither is fatal: the poll loop logs the error and tries again at the
/// next scheduled cycle.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Failed to fetch registered USB peripherals: {0}")]
    RemoteFetch(#[from] RegistryError),

    #[error("Failed to enumerate USB devices: {0}")]
    Enumeration(#[from] HardwareError),
}

impl CycleError {
    /// Short label for log fields
    pub fn stage(&self) -> &'static str {
        match self {
            CycleError::RemoteFetch(_) => "fetch",
            CycleError::Enumeration(_) => "enumerate",
        }
    }
}
