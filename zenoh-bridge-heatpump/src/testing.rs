//! Scripted transport and recording registry for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use heatsight_common::PointValue;

use crate::error::{BridgeError, Result};
use crate::registry::{HostRegistry, PointDescriptor};
use crate::transport::{Transport, TransportError};

/// One recorded bus exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    Read {
        base: u16,
        count: u16,
        exclusive: bool,
    },
    Write {
        address: u16,
        value: u16,
        exclusive: bool,
    },
}

#[derive(Debug, Default)]
struct BlockScript {
    failures: u32,
    values: Option<Vec<u16>>,
}

/// Transport answering from per-block scripts.
///
/// A block fails `failures` times, then answers with `values`; a block
/// without values always fails.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    blocks: Mutex<HashMap<u16, BlockScript>>,
    write_failures: Mutex<u32>,
    log: Mutex<Vec<Exchange>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, base: u16, values: &[u16]) -> Self {
        self.blocks.lock().unwrap().entry(base).or_default().values = Some(values.to_vec());
        self
    }

    pub fn fail_reads(self, base: u16, times: u32) -> Self {
        self.blocks.lock().unwrap().entry(base).or_default().failures = times;
        self
    }

    pub fn fail_writes(self, times: u32) -> Self {
        *self.write_failures.lock().unwrap() = times;
        self
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.log.lock().unwrap().clone()
    }

    pub fn reads_of(&self, base: u16) -> usize {
        self.exchanges()
            .iter()
            .filter(|e| matches!(e, Exchange::Read { base: b, .. } if *b == base))
            .count()
    }

    pub fn writes(&self) -> Vec<Exchange> {
        self.exchanges()
            .into_iter()
            .filter(|e| matches!(e, Exchange::Write { .. }))
            .collect()
    }
}

fn busy() -> TransportError {
    TransportError::Open {
        port: "/dev/ttyUSB0".to_string(),
        message: "Device or resource busy".to_string(),
    }
}

impl Transport for ScriptedTransport {
    async fn read_block(
        &self,
        base: u16,
        count: u16,
        exclusive: bool,
    ) -> std::result::Result<Vec<u16>, TransportError> {
        self.log.lock().unwrap().push(Exchange::Read {
            base,
            count,
            exclusive,
        });

        let mut blocks = self.blocks.lock().unwrap();
        let script = blocks.entry(base).or_default();
        if script.failures > 0 {
            script.failures -= 1;
            return Err(busy());
        }
        script.values.clone().ok_or_else(busy)
    }

    async fn write_register(
        &self,
        address: u16,
        value: u16,
        exclusive: bool,
    ) -> std::result::Result<(), TransportError> {
        self.log.lock().unwrap().push(Exchange::Write {
            address,
            value,
            exclusive,
        });

        let mut failures = self.write_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(busy());
        }
        Ok(())
    }
}

/// Registry that records declarations and updates.
#[derive(Debug, Default)]
pub struct RecordingRegistry {
    created: Mutex<Vec<PointDescriptor>>,
    updates: Mutex<Vec<(String, PointValue)>>,
    reject_updates: bool,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose updates all fail.
    pub fn rejecting() -> Self {
        Self {
            reject_updates: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<PointDescriptor> {
        self.created.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, PointValue)> {
        self.updates.lock().unwrap().clone()
    }

    /// Latest value published for `name`.
    pub fn value_of(&self, name: &str) -> Option<PointValue> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

impl HostRegistry for RecordingRegistry {
    async fn create_point(&self, descriptor: &PointDescriptor) -> Result<()> {
        self.created.lock().unwrap().push(descriptor.clone());
        Ok(())
    }

    async fn update_point(&self, name: &str, value: PointValue) -> Result<()> {
        if self.reject_updates {
            return Err(BridgeError::Publish {
                key: name.to_string(),
                message: "host unavailable".to_string(),
            });
        }
        self.updates.lock().unwrap().push((name.to_string(), value));
        Ok(())
    }
}
