//! Periphery agent - USB peripheral discovery daemon
//!
//! Mirrors the USB devices attached to this node into the node's
//! peripheral registry until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use periphery_agent::{Agent, Cli};
use periphery_hardware::{AttributeResolver, Normalizer, RusbBus, UdevAttributes, UsbIds};
use periphery_network::RegistryClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let in_kubernetes = std::env::var_os("KUBERNETES_SERVICE_HOST").is_some();
    let config = Cli::parse().into_config(in_kubernetes);
    config.validate().context("invalid configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        api = %config.api_base_url,
        "Periphery agent starting"
    );

    let bus = RusbBus::connect(config.init_retry(), config.enumeration_timeout)
        .await
        .context("cannot start USB discovery")?;

    let ids = UsbIds::discover(config.usb_ids_path.as_deref());
    let attributes = UdevAttributes::new(config.udevadm_path.clone(), config.attribute_timeout);
    let normalizer = Normalizer::new(
        ids,
        AttributeResolver::new(
            attributes,
            config.device_dir.clone(),
            config.secondary_device_prefix.clone(),
        ),
    );

    let registry = RegistryClient::new(config.registry_config()).context("invalid registry URL")?;
    let agent = Agent::new(&config, bus, normalizer, registry);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    agent.run(cancel).await;

    info!("Periphery agent stopped");
    Ok(())
}

/// Cancel `cancel` on Ctrl-C or, on Unix, SIGTERM.
async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
    cancel.cancel();
}
