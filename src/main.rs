//! Consul Config Source
//!
//! Polls a Consul KV facility on a fixed delay and logs every snapshot it
//! publishes.

use anyhow::{Context, Result};
use clap::Parser;
use consul_config_source::{
    config::{LogFormat, Settings},
    consul::ConsulClientFactory,
    logging::init_tracing,
    source::{poller, ConsulConfigurationSource, EndpointSelector, SnapshotExtractor},
};
use std::collections::BTreeMap;
use tokio::signal;

/// Consul Config Source
///
/// Polls a Consul KV facility and republishes it as flat property snapshots.
#[derive(Parser, Debug)]
#[command(name = "consul-config-source")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Comma-separated host[:port] list (overrides CONSUL_HOSTS env var)
    #[arg(long)]
    hosts: Option<String>,

    /// Namespace prefix to poll (overrides CONSUL_FACILITY env var)
    #[arg(short, long)]
    facility: Option<String>,

    /// Delay between polls in milliseconds (overrides POLL_INTERVAL_MS env var)
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format: json, pretty (overrides LOG_FORMAT env var)
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Disable catalog peer discovery
    #[arg(long)]
    no_discover_peers: bool,

    /// Poll once, print the snapshot as JSON and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration first (before logging, so we can use log_level)
    let mut settings = Settings::from_env()?;

    // Override settings with CLI arguments
    if let Some(hosts) = args.hosts {
        settings.hosts = hosts;
    }
    if let Some(facility) = args.facility {
        settings.facility = facility;
    }
    if let Some(interval_ms) = args.interval_ms {
        settings.poll_interval_ms = interval_ms;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(log_format) = args.log_format {
        settings.log_format = log_format;
    }
    if args.no_discover_peers {
        settings.discover_peers = false;
    }

    init_tracing(&settings.log_level, settings.log_format);
    settings.validate()?;

    tracing::info!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        hosts = %settings.hosts,
        facility = %settings.facility,
        interval_ms = settings.poll_interval_ms,
        "Starting application"
    );

    let mut source = build_source(&settings)?;

    if args.once {
        let snapshot = source
            .poll()
            .await
            .context("No configuration could be fetched from Consul")?;
        let sorted: BTreeMap<_, _> = snapshot.into_iter().collect();
        println!("{}", serde_json::to_string_pretty(&sorted)?);
        return Ok(());
    }

    let handle = poller::spawn(source, settings.poller_config());
    let mut snapshots = handle.subscribe();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    tracing::warn!("Poller stopped unexpectedly");
                    break;
                }
                if let Some(snapshot) = snapshots.borrow_and_update().as_ref() {
                    tracing::info!(
                        facility = %settings.facility,
                        properties = snapshot.len(),
                        "Published configuration snapshot"
                    );
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    let source = handle.shutdown().await.context("Poller task failed")?;
    tracing::info!(state = %source.state(), "Application shutdown complete");

    Ok(())
}

fn build_source(settings: &Settings) -> Result<ConsulConfigurationSource> {
    let factory = ConsulClientFactory::new(settings.client_options())
        .context("Failed to build Consul HTTP client")?;
    let selector = EndpointSelector::new(factory, settings.endpoints()?)
        .with_peer_discovery(settings.discover_peers);
    let extractor = SnapshotExtractor::new(settings.facility.as_str())?;
    Ok(ConsulConfigurationSource::from_parts(selector, extractor))
}

/// Create a future that completes when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
