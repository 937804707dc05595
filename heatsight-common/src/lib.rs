//! HeatSight Common Library
//!
//! Shared types and utilities for HeatSight heat-pump bridges:
//!
//! - [`telemetry`] - Point data model (`PointReading`, `PointValue`, `PointKind`)
//! - [`serialization`] - JSON/CBOR encoding and decoding
//! - [`config`] - Shared configuration sections (Zenoh, logging)
//! - [`session`] - Zenoh session management
//! - [`keyexpr`] - Key expression builder and command key parser
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod keyexpr;
pub mod serialization;
pub mod session;
pub mod telemetry;

pub use config::{LogFormat, LoggingConfig, ZenohConfig};
pub use error::{Error, Result};
pub use keyexpr::{CommandKey, KEY_PREFIX, KeyExprBuilder};
pub use serialization::{Format, decode, decode_auto, encode};
pub use session::connect;
pub use telemetry::{PointKind, PointReading, PointValue, current_timestamp_millis};

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over `config.level` when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    result.map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))
}
