//! Zenoh bridge for Emmeti EQ2021 heat pumps.
//!
//! Polls the heat pump's holding registers over Modbus RTU, publishes the
//! decoded temperatures and setpoints to Zenoh, and forwards setpoint
//! changes received from Zenoh back to the device.
//!
//! # Key Expressions
//!
//! ```text
//! heatsight/heatpump/<device>/<point>              readings
//! heatsight/heatpump/<device>/<point>/set          write commands
//! heatsight/heatpump/<device>/@/points/<point>     point descriptors
//! heatsight/heatpump/@/status                      bridge status
//! ```
//!
//! # Bus access
//!
//! All bus traffic goes through one controller task ([`bridge::HeatPumpBridge`]).
//! Each exchange opens the serial port, performs one request and closes it
//! again; failed exchanges are retried by [`retry::RetryPolicy`], and failed
//! poll cycles stretch the poll period ([`scheduler::PollScheduler`]).

pub mod bridge;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod lang;
pub mod registers;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod status;
pub mod transport;

#[cfg(test)]
mod testing;

pub use bridge::HeatPumpBridge;
pub use config::HeatPumpBridgeConfig;
pub use error::{BridgeError, Result};
