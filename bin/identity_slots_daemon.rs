//! # Identity Slots Daemon
//!
//! Resolves identity levels and slot quotas for a set of accounts against the
//! configured profile registry.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin identity_slots_daemon -- 0xfe9e8709d3215310075d67e3ed32a380ccf451c8
//! cargo run --bin identity_slots_daemon -- --watch 0xB6b5089844F439018635bab88B36cd4705f0d090
//! ```
//!
//! With `--watch` the refresh loop keeps running and the cached levels are
//! printed after every interval. Press Ctrl+C to stop gracefully.

use anyhow::Result;
use clap::Parser;
use ethers::prelude::{Address, Http, Provider};
use futures::future::join_all;
use identity_slots_sdk::{
    metrics, settings::Settings, IdentityExtension, MiddlewareTransport, ACCOUNT_SLOTS_DEFAULTS,
};
use std::str::FromStr;
use std::sync::Arc;
use tokio::signal;
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(name = "identity_slots_daemon", about = "Resolve identity levels and slot quotas")]
struct Args {
    /// Accounts to resolve
    addresses: Vec<String>,

    /// RPC endpoint (overrides settings)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Profile registry address (overrides settings)
    #[arg(long)]
    registry: Option<String>,

    /// Keep refreshing until Ctrl+C
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    #[cfg(feature = "observability")]
    {
        metrics_exporter_prometheus::PrometheusBuilder::new().install()?;
        println!("✅ Prometheus exporter installed");
    }
    metrics::describe_metrics();

    // 1. Load settings
    let mut settings = Settings::new()?;
    if let Some(url) = args.rpc_url {
        settings.rpc.http_url = url;
    }
    if let Some(registry) = args.registry {
        settings.identity.profile_registry_address = registry;
    }
    println!("✅ Settings loaded (rpc: {})", settings.rpc.http_url);

    let addresses = args
        .addresses
        .iter()
        .map(|s| Address::from_str(s).map_err(|e| anyhow::anyhow!("invalid address {}: {}", s, e)))
        .collect::<Result<Vec<_>>>()?;

    // 2. Connect provider and start the extension
    let provider = Arc::new(Provider::<Http>::try_from(settings.rpc.http_url.as_str())?);
    let transport = Arc::new(MiddlewareTransport::new(provider));
    let extension = IdentityExtension::new(&settings.identity, transport)?;
    println!("✅ Identity extension started");

    // 3. Resolve requested accounts
    let quotas = join_all(addresses.iter().map(|a| extension.account_slots(*a))).await;
    for (address, slots) in addresses.iter().zip(quotas) {
        let level = extension.level_of(address).await.unwrap_or_default();
        println!("  {:?}  level={:<12} slots={}", address, level, slots);
    }

    if args.watch {
        println!("\nRefreshing every {:?}. Press Ctrl+C to stop...\n", extension.update_interval());
        let mut ticker = interval(extension.update_interval());
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = signal::ctrl_c() => break,
                _ = ticker.tick() => {
                    for (address, level) in extension.store().snapshot().await {
                        println!(
                            "  {:?}  level={:<12} slots={}",
                            address,
                            level,
                            ACCOUNT_SLOTS_DEFAULTS.slots_for(level)
                        );
                    }
                    println!();
                }
            }
        }
        println!("\n🛑 Shutdown signal received");
    }

    extension.stop().await;
    println!("✅ Shutdown complete");

    Ok(())
}
