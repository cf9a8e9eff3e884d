//! Stream app installs from the Towns app registry
//!
//! Reads `TOWNS_CHAIN_ID`, `TOWNS_RPC_URL` and `TOWNS_APP_REGISTRY` from the
//! environment (or a `.env` file) and prints every `AppInstalled` event from
//! the current head onwards.
//!
//! ```bash
//! RUST_LOG=towns_bindings=debug cargo run --example watch_app_installs
//! ```
//!
//! Pass an app address as the first argument to only see installs of that app.

use alloy_primitives::Address;
use alloy_provider::ProviderBuilder;
use futures::StreamExt;
use std::time::Duration;
use towns_bindings::contracts::app_registry::{AppRegistryContract, IAppRegistry};
use towns_bindings::{ContractAddresses, EventPollingConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_RPC_URL: &str = "http://localhost:8545";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let addresses = ContractAddresses::from_env()?;
    let rpc_url = match &addresses.rpc_url {
        Some(url) => url.clone(),
        None => DEFAULT_RPC_URL.parse()?,
    };
    let provider = ProviderBuilder::new().connect_http(rpc_url);

    let registry = AppRegistryContract::new(addresses.require_app_registry()?, provider);
    let apps: Vec<Address> = std::env::args()
        .skip(1)
        .map(|arg| arg.parse())
        .collect::<Result<_, _>>()?;

    info!(
        chain_id = addresses.chain_id,
        registry = %registry.address(),
        app_filter_count = apps.len(),
        "Watching app installs"
    );

    let query = registry.app_installed_query(&apps, &[], &[]);
    let events = registry.events().with_config(
        EventPollingConfig::default()
            .with_poll_interval(Duration::from_secs(4))
            .with_max_block_range(500),
    );
    let mut installs = Box::pin(events.watch::<IAppRegistry::AppInstalled>(query));

    while let Some(install) = installs.next().await {
        let install = install?;
        println!(
            "block {:>10}  app {}  account {}  id {}",
            install.block_number.unwrap_or_default(),
            install.event.app,
            install.event.account,
            install.event.appId
        );
    }

    Ok(())
}
