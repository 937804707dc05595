//! Configuration for the heat-pump bridge.

use std::path::Path;
use std::time::Duration;

use heatsight_common::{Format, KEY_PREFIX, LoggingConfig, ZenohConfig};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::lang::Language;
use crate::retry::RetryPolicy;

/// Poll intervals offered by the host UI.
pub const POLL_INTERVALS_SECS: [u64; 6] = [10, 20, 30, 60, 120, 240];

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatPumpBridgeConfig {
    /// Zenoh connection settings
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Wire format for readings
    #[serde(default)]
    pub serialization: Format,

    /// Heat-pump specific settings
    pub heatpump: HeatPumpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Heat pump and bus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatPumpConfig {
    /// Key expression prefix (default: "heatsight/heatpump")
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Device name (used in key expressions)
    #[serde(default = "default_device")]
    pub device: String,

    /// Serial bus settings
    pub serial: SerialConfig,

    /// Nominal poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Language of point labels ("en", "it"); unsupported codes fall back to "en"
    #[serde(default = "default_language")]
    pub language: String,

    /// Log every decoded point at info level
    #[serde(default)]
    pub debug: bool,

    /// Retry budgets
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_key_prefix() -> String {
    KEY_PREFIX.to_string()
}

fn default_device() -> String {
    "eq2021".to_string()
}

fn default_poll_interval() -> u64 {
    30
}

fn default_language() -> String {
    "en".to_string()
}

/// Modbus RTU serial settings. Framing is fixed at 8E1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0")
    pub port: String,

    /// Baud rate (default: 9600)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Modbus slave address (default: 3)
    #[serde(default = "default_slave")]
    pub slave: u8,

    /// Per-exchange I/O timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_slave() -> u8 {
    3
}

fn default_timeout_ms() -> u64 {
    200
}

/// Retry budgets for reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_read_attempts")]
    pub read_attempts: u32,

    #[serde(default = "default_write_attempts")]
    pub write_attempts: u32,

    /// Pause between failed attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

fn default_read_attempts() -> u32 {
    2
}

fn default_write_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    200
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            read_attempts: default_read_attempts(),
            write_attempts: default_write_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn read_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.read_attempts, Duration::from_millis(self.delay_ms))
    }

    pub fn write_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.write_attempts, Duration::from_millis(self.delay_ms))
    }
}

impl HeatPumpConfig {
    /// Resolved label language.
    pub fn language(&self) -> Language {
        Language::resolve(&self.language)
    }
}

impl HeatPumpBridgeConfig {
    /// Load configuration from a JSON5 file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BridgeError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: HeatPumpBridgeConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let hp = &self.heatpump;

        if hp.device.is_empty() || hp.device.contains(['/', '*', '$', '#', '?']) {
            return Err(BridgeError::validation(format!(
                "device name '{}' is not a valid key segment",
                hp.device
            )));
        }

        if hp.serial.port.is_empty() {
            return Err(BridgeError::validation("serial port cannot be empty"));
        }

        if !(1..=247).contains(&hp.serial.slave) {
            return Err(BridgeError::validation(format!(
                "slave address {} out of range 1-247",
                hp.serial.slave
            )));
        }

        if hp.serial.baud_rate == 0 {
            return Err(BridgeError::validation("baud rate must be positive"));
        }

        if hp.serial.timeout_ms == 0 {
            return Err(BridgeError::validation("timeout_ms must be positive"));
        }

        if !POLL_INTERVALS_SECS.contains(&hp.poll_interval_secs) {
            return Err(BridgeError::validation(format!(
                "poll_interval_secs {} not one of {:?}",
                hp.poll_interval_secs, POLL_INTERVALS_SECS
            )));
        }

        if hp.retry.read_attempts == 0 || hp.retry.write_attempts == 0 {
            return Err(BridgeError::validation(
                "retry attempts must be at least 1",
            ));
        }

        Ok(())
    }
}
