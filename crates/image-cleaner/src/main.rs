//! Image Cleaner - disk-pressure driven container image garbage collector
//!
//! This binary runs as a DaemonSet on each Kubernetes node, deleting unused
//! images once the runtime's filesystem crosses a high-water mark and
//! cordoning the node while it does so.

use anyhow::Result;
use cleaner_lib::{
    inventory::ImageInventory, runtime::DEFAULT_DOCKER_TIMEOUT, DockerRuntime,
    EvictionEngineBuilder, KubeNodeCordoner, SchedulingGate, StatvfsSampler, StructuredLogger,
    UsageSampler,
};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const CLEANER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting image-cleaner");

    // Load configuration
    let config = config::CleanerConfig::load()?;
    let engine_config = config.engine_config()?;
    info!(
        node_name = ?config.node_name,
        path = %config.path_to_check.display(),
        "Cleaner configured"
    );

    // Verify we can talk to the node before doing anything else
    let gate = match &config.node_name {
        Some(node) => {
            let cordoner = KubeNodeCordoner::try_default().await?;
            SchedulingGate::for_node(node.clone(), Arc::new(cordoner))
        }
        None => {
            info!("NODE_NAME not set, node will not be cordoned during eviction");
            SchedulingGate::disabled()
        }
    };
    gate.verify().await?;

    // Fail fast on a path that cannot be stat'ed
    let sampler = Arc::new(StatvfsSampler::new(&config.path_to_check));
    let initial = sampler.sample().await?;

    let docker = Arc::new(DockerRuntime::connect(DEFAULT_DOCKER_TIMEOUT)?);
    let images = ImageInventory::new(docker.clone()).snapshot().await?;

    let logger = StructuredLogger::new(config.node_name.as_deref());
    logger.log_inventory(
        images.len(),
        images.iter().filter(|i| i.is_dangling()).count(),
    );

    let engine = EvictionEngineBuilder::new()
        .sampler(sampler)
        .lister(docker.clone())
        .deleter(docker)
        .gate(gate)
        .logger(logger.clone())
        .config(engine_config)
        .build()?;

    logger.log_startup(
        CLEANER_VERSION,
        &config.path_to_check,
        engine.config().gc_low,
        engine.config().gc_high,
    );
    logger.log_usage(initial.percent_used);

    // Translate SIGINT/SIGTERM into the shutdown broadcast
    let mut terminate = signal(SignalKind::terminate())?;
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        let reason = tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => "SIGINT received",
                Err(e) => {
                    error!(error = %e, "Failed to listen for SIGINT");
                    "SIGINT listener failed"
                }
            },
            _ = terminate.recv() => "SIGTERM received",
        };
        logger.log_shutdown(reason);
        let _ = shutdown_tx.send(());
    });

    engine.run(shutdown_rx).await?;
    info!("Shutdown complete");

    Ok(())
}
