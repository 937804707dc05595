//! Bridge liveness announcements.

use heatsight_common::Format;
use serde::{Deserialize, Serialize};

use crate::config::HeatPumpConfig;
use crate::error::{BridgeError, Result};
use crate::registry::ZenohRegistry;

/// Bridge name used in status payloads.
pub const BRIDGE_NAME: &str = "heatpump";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeState {
    Running,
    Offline,
}

/// Payload published to `<prefix>/@/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub bridge: String,
    pub version: String,
    pub status: BridgeState,
    #[serde(flatten)]
    pub metadata: serde_json::Value,
}

impl BridgeStatus {
    fn new(status: BridgeState) -> Self {
        Self {
            bridge: BRIDGE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn running() -> Self {
        Self::new(BridgeState::Running)
    }

    pub fn offline() -> Self {
        Self::new(BridgeState::Offline)
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Describe the polled device.
    pub fn with_device(self, config: &HeatPumpConfig) -> Self {
        self.with_metadata(serde_json::json!({
            "device": config.device,
            "port": config.serial.port,
            "slave": config.serial.slave,
            "poll_interval_secs": config.poll_interval_secs,
            "language": config.language().code(),
        }))
    }

    pub async fn publish(&self, registry: &ZenohRegistry) -> Result<()> {
        let key = registry.keys().status();
        let payload =
            serde_json::to_vec(self).map_err(|e| BridgeError::Serialization(e.to_string()))?;
        registry.put(&key, payload, Format::Json).await
    }
}
