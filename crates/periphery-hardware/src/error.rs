//! Error types for host USB operations.
//!
//! This module defines error types for the host capabilities the agent
//! consumes: USB subsystem initialization, device enumeration, attribute
//! queries and directory listing.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during host USB operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The USB subsystem could not be initialized after all attempts.
    ///
    /// This is the only hardware error that is fatal to the agent.
    #[error("USB subsystem unavailable after {attempts} attempts: {message}")]
    SubsystemUnavailable { attempts: u32, message: String },

    /// Listing the attached devices failed.
    #[error("Enumeration failed: {message}")]
    Enumeration { message: String },

    /// Operation timed out after specified duration.
    #[error("{operation} timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// Attribute query for a device node failed.
    #[error("Attribute query failed for {node}: {message}")]
    AttributeQuery { node: String, message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new subsystem unavailable error.
    pub fn subsystem_unavailable(attempts: u32, message: impl Into<String>) -> Self {
        Self::SubsystemUnavailable {
            attempts,
            message: message.into(),
        }
    }

    /// Create a new enumeration error.
    pub fn enumeration(message: impl Into<String>) -> Self {
        Self::Enumeration {
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms,
        }
    }

    /// Create a new attribute query error.
    pub fn attribute_query(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AttributeQuery {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Whether this error must stop the agent.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SubsystemUnavailable { .. })
    }
}
