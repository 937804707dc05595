//! Serial transport guard: one Modbus RTU exchange per call.
//!
//! Every exchange opens the port, performs a single request and drops the
//! session before returning, so no handle lingers between polls and a second
//! master process on the same RS-485 bus can get its turn.
//!
//! Masters sharing the port coordinate through an advisory `flock`. The
//! tty-level exclusive mode is always cleared, so an attempt that skips the
//! advisory lock can still open the port while another master holds it.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tokio_serial::{DataBits, Parity, SerialStream, StopBits};
use tracing::trace;

use crate::config::SerialConfig;

/// Why a single exchange failed.
///
/// Callers do not distinguish causes: every variant leads to the same retry.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open {port}: {message}")]
    Open { port: String, message: String },
    #[error("failed to lock {port}: {message}")]
    Lock { port: String, message: String },
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("bus error: {0}")]
    Io(String),
    #[error("slave exception: {0}")]
    Exception(String),
    #[error("expected {expected} registers, got {got}")]
    Framing { expected: u16, got: usize },
}

/// One-shot access to the heat pump's registers.
pub trait Transport {
    /// Read `count` holding registers starting at `base`.
    ///
    /// `exclusive` holds the advisory port lock for this exchange; without it
    /// the exchange proceeds whoever holds the lock.
    fn read_block(
        &self,
        base: u16,
        count: u16,
        exclusive: bool,
    ) -> impl Future<Output = Result<Vec<u16>, TransportError>> + Send;

    /// Write a single holding register.
    fn write_register(
        &self,
        address: u16,
        value: u16,
        exclusive: bool,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Modbus RTU over a local serial port: 8 data bits, even parity, 1 stop bit.
#[derive(Debug, Clone)]
pub struct SerialTransport {
    port: String,
    baud_rate: u32,
    slave: u8,
    timeout: Duration,
}

impl SerialTransport {
    pub fn new(config: &SerialConfig) -> Self {
        Self {
            port: config.port.clone(),
            baud_rate: config.baud_rate,
            slave: config.slave,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Open the port and attach an RTU client for one exchange.
    fn open(&self, exclusive: bool) -> Result<TransportSession, TransportError> {
        let builder = tokio_serial::new(&self.port, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::Even)
            .stop_bits(StopBits::One)
            .timeout(self.timeout);

        #[allow(unused_mut)]
        let mut serial = SerialStream::open(&builder).map_err(|e| TransportError::Open {
            port: self.port.clone(),
            message: e.to_string(),
        })?;

        // The serial layer claims TIOCEXCL on open; other masters must not see EBUSY.
        #[cfg(unix)]
        serial
            .set_exclusive(false)
            .map_err(|e| TransportError::Lock {
                port: self.port.clone(),
                message: e.to_string(),
            })?;

        let lock = if exclusive {
            Some(lock_port(&self.port)?)
        } else {
            None
        };

        trace!(port = %self.port, exclusive, "Serial port opened");

        Ok(TransportSession {
            ctx: rtu::attach_slave(serial, Slave(self.slave)),
            _lock: lock,
        })
    }

    async fn bounded<T, F>(&self, exchange: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}

#[cfg(unix)]
type PortLock = nix::fcntl::Flock<std::fs::File>;
#[cfg(not(unix))]
type PortLock = ();

/// Take the advisory exclusive lock on `port` without blocking.
#[cfg(unix)]
fn lock_port(port: &str) -> Result<PortLock, TransportError> {
    use nix::fcntl::{Flock, FlockArg, OFlag};
    use std::os::unix::fs::OpenOptionsExt;

    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags((OFlag::O_NOCTTY | OFlag::O_NONBLOCK).bits())
        .open(port)
        .map_err(|e| TransportError::Open {
            port: port.to_string(),
            message: e.to_string(),
        })?;

    Flock::lock(file, FlockArg::LockExclusiveNonblock).map_err(|(_, errno)| {
        TransportError::Lock {
            port: port.to_string(),
            message: errno.desc().to_string(),
        }
    })
}

#[cfg(not(unix))]
fn lock_port(_port: &str) -> Result<PortLock, TransportError> {
    Ok(())
}

/// An open port for exactly one exchange; dropping it closes the port, then
/// releases the lock.
struct TransportSession {
    ctx: Context,
    _lock: Option<PortLock>,
}

impl TransportSession {
    async fn read_holding(&mut self, base: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        let values = self
            .ctx
            .read_holding_registers(base, count)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?
            .map_err(|e| TransportError::Exception(format!("{:?}", e)))?;

        if values.len() != usize::from(count) {
            return Err(TransportError::Framing {
                expected: count,
                got: values.len(),
            });
        }
        Ok(values)
    }

    async fn write_single(&mut self, address: u16, value: u16) -> Result<(), TransportError> {
        self.ctx
            .write_single_register(address, value)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?
            .map_err(|e| TransportError::Exception(format!("{:?}", e)))
    }
}

impl Transport for SerialTransport {
    async fn read_block(
        &self,
        base: u16,
        count: u16,
        exclusive: bool,
    ) -> Result<Vec<u16>, TransportError> {
        let mut session = self.open(exclusive)?;
        self.bounded(session.read_holding(base, count)).await
    }

    async fn write_register(
        &self,
        address: u16,
        value: u16,
        exclusive: bool,
    ) -> Result<(), TransportError> {
        let mut session = self.open(exclusive)?;
        self.bounded(session.write_single(address, value)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(port: &str) -> SerialConfig {
        SerialConfig {
            port: port.to_string(),
            baud_rate: 9600,
            slave: 3,
            timeout_ms: 200,
        }
    }

    #[test]
    fn test_transport_from_config() {
        let transport = SerialTransport::new(&config("/dev/ttyUSB0"));
        assert_eq!(transport.port, "/dev/ttyUSB0");
        assert_eq!(transport.slave, 3);
        assert_eq!(transport.timeout, Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_missing_port_fails_to_open() {
        let transport = SerialTransport::new(&config("/dev/heatsight-does-not-exist"));

        let err = transport.read_block(2019, 5, true).await.unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }), "{err}");

        let err = transport.write_register(1104, 160, false).await.unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn test_port_lock_is_exclusive_until_dropped() {
        let port = tempfile::NamedTempFile::new().unwrap();
        let path = port.path().to_str().unwrap();

        let held = lock_port(path).unwrap();
        let err = lock_port(path).unwrap_err();
        assert!(matches!(err, TransportError::Lock { .. }), "{err}");

        drop(held);
        assert!(lock_port(path).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_lock_on_missing_port_is_open_error() {
        let err = lock_port("/dev/heatsight-does-not-exist").unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }), "{err}");
    }

    #[test]
    fn test_error_messages() {
        let err = TransportError::Framing {
            expected: 5,
            got: 3,
        };
        assert_eq!(err.to_string(), "expected 5 registers, got 3");
        assert_eq!(
            TransportError::Timeout(Duration::from_millis(200)).to_string(),
            "no response within 200ms"
        );
    }
}
