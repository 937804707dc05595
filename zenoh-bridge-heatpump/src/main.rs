//! Zenoh bridge for Emmeti EQ2021 heat pumps.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use heatsight_common::KeyExprBuilder;
use tracing::{error, info, warn};
use zenoh_bridge_heatpump::HeatPumpBridge;
use zenoh_bridge_heatpump::config::HeatPumpBridgeConfig;
use zenoh_bridge_heatpump::registry::ZenohRegistry;
use zenoh_bridge_heatpump::status::BridgeStatus;
use zenoh_bridge_heatpump::transport::SerialTransport;

/// Zenoh bridge for Emmeti EQ2021 heat pumps (Modbus RTU).
#[derive(Parser, Debug)]
#[command(name = "zenoh-bridge-heatpump")]
#[command(about = "Polls an EQ2021 heat pump over Modbus RTU and publishes to Zenoh")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "heatpump.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = HeatPumpBridgeConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let mut log_config = config.logging.clone();
    if let Some(level) = &args.log_level {
        log_config.level = level.clone();
    }
    heatsight_common::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    let hp = &config.heatpump;
    info!(
        device = %hp.device,
        port = %hp.serial.port,
        slave = hp.serial.slave,
        "Starting zenoh-bridge-heatpump"
    );

    let session = Arc::new(
        heatsight_common::connect(&config.zenoh)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to Zenoh: {}", e))?,
    );

    let registry = ZenohRegistry::new(
        session.clone(),
        KeyExprBuilder::new(&hp.key_prefix),
        &hp.device,
        config.serialization,
    );
    let commands = registry
        .subscribe_commands()
        .await
        .context("Failed to subscribe to write commands")?;

    let mut bridge =
        HeatPumpBridge::from_config(SerialTransport::new(&hp.serial), registry.clone(), hp);
    bridge
        .declare_points()
        .await
        .context("Failed to declare points")?;

    if let Err(e) = BridgeStatus::running().with_device(hp).publish(&registry).await {
        error!(error = %e, "Failed to publish bridge status");
    }

    tokio::select! {
        _ = bridge.run(commands) => {
            warn!("Bridge loop exited");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Received shutdown signal");
        }
    }

    if let Err(e) = BridgeStatus::offline().publish(&registry).await {
        warn!(error = %e, "Failed to publish offline status");
    }

    session
        .close()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to close Zenoh session: {}", e))?;
    info!("Heat-pump bridge stopped");

    Ok(())
}
