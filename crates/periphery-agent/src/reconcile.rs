//! Observed versus registered peripherals.
//!
//! [`reconcile`] computes the registry writes that make the registered set
//! equal to the observed one:
//!
//! ```text
//! observed only        ──► Create(peripheral)
//! both, fields differ  ──► Update { identifier, peripheral }
//! both, fields equal   ──► (nothing)
//! registered only      ──► Delete { identifier }
//! ```
//!
//! Registry metadata (`id`, `version`, `parent`) never takes part in the
//! comparison.

use std::collections::BTreeMap;
use std::fmt;

use periphery_core::{Peripheral, RemotePeripheral};
use tracing::{trace, warn};

/// One registry write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Create(Peripheral),
    Update {
        identifier: String,
        peripheral: Peripheral,
    },
    Delete {
        identifier: String,
    },
}

impl Operation {
    /// Identifier of the record this operation touches
    pub fn identifier(&self) -> &str {
        match self {
            Operation::Create(peripheral) => &peripheral.identifier,
            Operation::Update { identifier, .. } | Operation::Delete { identifier } => identifier,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Create(_) => "create",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.identifier())
    }
}

/// Compute the operations that converge `remote` onto `observed`.
///
/// Observed peripherals sharing an identifier are not told apart: the one
/// observed last wins. Operations come out with observed identifiers in
/// ascending order, followed by deletes in ascending order.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use periphery_agent::{Operation, reconcile};
/// use periphery_core::Peripheral;
///
/// let webcam = Peripheral::new("046d:0825", "Webcam C270");
/// let operations = reconcile(vec![webcam.clone()], BTreeMap::new());
/// assert_eq!(operations, vec![Operation::Create(webcam)]);
/// ```
pub fn reconcile(
    observed: Vec<Peripheral>,
    mut remote: BTreeMap<String, RemotePeripheral>,
) -> Vec<Operation> {
    let mut operations = Vec::new();

    for (identifier, peripheral) in index_observed(observed) {
        match remote.remove(&identifier) {
            None => operations.push(Operation::Create(peripheral)),
            Some(registered) if registered.matches(&peripheral) => {
                trace!(identifier = %identifier, "Peripheral unchanged");
            }
            Some(_) => operations.push(Operation::Update {
                identifier,
                peripheral,
            }),
        }
    }

    operations.extend(
        remote
            .into_keys()
            .map(|identifier| Operation::Delete { identifier }),
    );

    operations
}

fn index_observed(observed: Vec<Peripheral>) -> BTreeMap<String, Peripheral> {
    let mut indexed = BTreeMap::new();

    for peripheral in observed {
        let identifier = peripheral.identifier.clone();
        if let Some(previous) = indexed.insert(identifier, peripheral) {
            warn!(
                identifier = %previous.identifier,
                replaced = ?previous.device_path,
                "Several attached devices share an identifier, keeping the last one"
            );
        }
    }

    indexed
}
