//! Discovery poll loop.
//!
//! # Cycle
//!
//! ```text
//! wait_until_healthy ─► ┌─────────────────────────────────────────────┐
//!                       │ fetch registered ─► enumerate ─► normalize  │
//!                       │        ─► reconcile ─► execute operations   │
//!                       └──────────────┬──────────────────────────────┘
//!                                      │ sleep(poll_interval) or cancel
//!                                      └──────────► next cycle
//! ```
//!
//! Cycles run one at a time and everything inside a cycle is awaited in
//! sequence. A cycle that cannot fetch the registered set or enumerate the
//! bus is abandoned before any write; a failed write is logged and counted,
//! and the remaining operations still run.

use std::time::Duration;

use periphery_hardware::{AttributeSource, Normalizer, UsbBus};
use periphery_network::{RegistryApi, RegistryError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::AgentConfig;
use crate::error::CycleError;
use crate::reconcile::{Operation, reconcile};

/// Outcome of one discovery cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Devices normalized this cycle
    pub observed: usize,

    /// Operations computed by the reconciler
    pub planned: usize,

    pub created: usize,
    pub updated: usize,
    pub deleted: usize,

    /// Operations the registry did not accept
    pub failed: usize,
}

impl CycleReport {
    /// Whether the registry already matched the attached devices
    pub fn is_converged(&self) -> bool {
        self.planned == 0
    }

    fn record_success(&mut self, operation: &Operation) {
        match operation {
            Operation::Create(_) => self.created += 1,
            Operation::Update { .. } => self.updated += 1,
            Operation::Delete { .. } => self.deleted += 1,
        }
    }
}

/// Keeps the peripheral registry in sync with the attached USB devices.
///
/// `B` lists the devices, `A` answers attribute queries for the normalizer
/// and `R` is the registry being kept in sync.
pub struct Agent<B, A, R> {
    bus: B,
    normalizer: Normalizer<A>,
    registry: R,
    poll_interval: Duration,
    healthcheck_interval: Duration,
}

impl<B, A, R> Agent<B, A, R>
where
    B: UsbBus,
    A: AttributeSource,
    R: RegistryApi,
{
    pub fn new(config: &AgentConfig, bus: B, normalizer: Normalizer<A>, registry: R) -> Self {
        Self {
            bus,
            normalizer,
            registry,
            poll_interval: config.poll_interval,
            healthcheck_interval: config.healthcheck_interval,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Run cycles until `cancel` fires.
    ///
    /// The first cycle starts once the registry reports itself healthy.
    /// Cycle errors are logged and never end the loop.
    pub async fn run(&self, cancel: CancellationToken) {
        if !self.wait_until_healthy(&cancel).await {
            info!("Cancelled before the registry became available");
            return;
        }

        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Starting USB peripheral discovery"
        );

        loop {
            match self.run_cycle().await {
                Ok(report) if report.is_converged() => {
                    debug!(observed = report.observed, "USB peripherals already in sync");
                }
                Ok(report) => {
                    info!(
                        observed = report.observed,
                        created = report.created,
                        updated = report.updated,
                        deleted = report.deleted,
                        failed = report.failed,
                        "Discovery cycle complete"
                    );
                }
                Err(e) => {
                    error!(stage = e.stage(), "Discovery cycle abandoned: {}", e);
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("USB peripheral discovery stopped");
    }

    /// Poll the registry health check until it answers, or until `cancel`
    /// fires. Returns whether the registry became healthy.
    pub async fn wait_until_healthy(&self, cancel: &CancellationToken) -> bool {
        let mut probes: u64 = 0;

        loop {
            probes += 1;
            if self.registry.is_healthy().await {
                debug!(probes, "Registry is healthy");
                return true;
            }

            if probes == 1 {
                info!("Waiting for the registry to become available");
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(self.healthcheck_interval) => {}
            }
        }
    }

    /// Run one full discovery cycle.
    ///
    /// # Errors
    ///
    /// Returns `CycleError::RemoteFetch` when the registered set cannot be
    /// read and `CycleError::Enumeration` when the bus cannot be listed. In
    /// both cases nothing was written to the registry.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let remote = self.registry.fetch_usb_peripherals().await?;
        let descriptors = self.bus.enumerate().await?;

        let mut observed = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            observed.push(self.normalizer.normalize(descriptor).await);
        }

        let mut report = CycleReport {
            observed: observed.len(),
            ..CycleReport::default()
        };

        let operations = reconcile(observed, remote);
        report.planned = operations.len();

        for operation in &operations {
            match self.execute(operation).await {
                Ok(()) => report.record_success(operation),
                Err(e) => {
                    report.failed += 1;
                    error!(
                        identifier = %operation.identifier(),
                        operation = operation.kind(),
                        "Registry rejected peripheral change: {}",
                        e
                    );
                }
            }
        }

        Ok(report)
    }

    async fn execute(&self, operation: &Operation) -> Result<(), RegistryError> {
        match operation {
            Operation::Create(peripheral) => {
                info!(
                    identifier = %peripheral.identifier,
                    name = %peripheral.name,
                    "Creating new USB peripheral"
                );
                self.registry.create(peripheral).await
            }
            Operation::Update {
                identifier,
                peripheral,
            } => {
                info!(identifier = %identifier, "Updating USB peripheral");
                self.registry.update(identifier, peripheral).await
            }
            Operation::Delete { identifier } => {
                info!(identifier = %identifier, "Removing USB peripheral no longer attached");
                self.registry.delete(identifier).await
            }
        }
    }
}
