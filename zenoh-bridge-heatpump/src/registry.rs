//! Host registry: where points are declared, readings land and write commands come from.
//!
//! The host is a Zenoh key space. [`ZenohRegistry`] publishes descriptors and
//! readings, [`ZenohCommands`] receives write requests.

use std::future::Future;
use std::sync::Arc;

use heatsight_common::{
    Format, KeyExprBuilder, PointKind, PointReading, PointValue, decode, decode_auto, encode,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use zenoh::Session;
use zenoh::handlers::FifoChannelHandler;
use zenoh::pubsub::Subscriber;
use zenoh::sample::Sample;

use crate::error::{BridgeError, Result};
use crate::registers::Presentation;

/// Point metadata announced once at startup.
#[derive(Debug, Clone, Serialize)]
pub struct PointDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: PointKind,
    pub writable: bool,
    pub address: u16,
    pub presentation: Presentation,
}

/// A write request received from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteCommand {
    pub point: String,
    pub level: f64,
}

impl WriteCommand {
    pub fn new(point: impl Into<String>, level: f64) -> Self {
        Self {
            point: point.into(),
            level,
        }
    }
}

/// Accepted command payloads: a bare number or `{ "level": n }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandPayload {
    Level(f64),
    Object { level: f64 },
}

impl CommandPayload {
    fn level(self) -> f64 {
        match self {
            CommandPayload::Level(level) | CommandPayload::Object { level } => level,
        }
    }
}

/// The host's named-point registry.
pub trait HostRegistry {
    /// Declare a point (idempotent on the host side).
    fn create_point(&self, descriptor: &PointDescriptor)
    -> impl Future<Output = Result<()>> + Send;

    /// Publish the latest value of a point.
    fn update_point(&self, name: &str, value: PointValue)
    -> impl Future<Output = Result<()>> + Send;
}

/// Source of pending host write commands.
pub trait CommandSource {
    /// Next command, or `None` once the source is closed.
    fn next_command(&mut self) -> impl Future<Output = Option<WriteCommand>> + Send;
}

impl CommandSource for mpsc::Receiver<WriteCommand> {
    async fn next_command(&mut self) -> Option<WriteCommand> {
        self.recv().await
    }
}

/// Registry backed by a Zenoh session.
#[derive(Clone, Debug)]
pub struct ZenohRegistry {
    session: Arc<Session>,
    keys: KeyExprBuilder,
    device: String,
    format: Format,
}

impl ZenohRegistry {
    pub fn new(
        session: Arc<Session>,
        keys: KeyExprBuilder,
        device: impl Into<String>,
        format: Format,
    ) -> Self {
        Self {
            session,
            keys,
            device: device.into(),
            format,
        }
    }

    /// Key expression builder in use.
    pub fn keys(&self) -> &KeyExprBuilder {
        &self.keys
    }

    /// Device name used in key expressions.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Subscribe to write commands for this device.
    pub async fn subscribe_commands(&self) -> Result<ZenohCommands> {
        let key_expr = self.keys.command_wildcard(&self.device);
        let subscriber = self.session.declare_subscriber(&key_expr).await?;
        debug!(key = %key_expr, "Listening for write commands");

        Ok(ZenohCommands {
            subscriber,
            keys: self.keys.clone(),
            device: self.device.clone(),
        })
    }

    /// Publish an encoded payload to a key, tagged with its MIME type.
    pub async fn put(&self, key: &str, payload: Vec<u8>, format: Format) -> Result<()> {
        self.session
            .put(key, payload)
            .encoding(format.mime_type())
            .await
            .map_err(|e| BridgeError::Publish {
                key: key.to_string(),
                message: e.to_string(),
            })
    }
}

impl HostRegistry for ZenohRegistry {
    async fn create_point(&self, descriptor: &PointDescriptor) -> Result<()> {
        let key = self.keys.descriptor(&self.device, descriptor.name);
        let payload = serde_json::to_vec(descriptor)
            .map_err(|e| BridgeError::Serialization(e.to_string()))?;
        self.put(&key, payload, Format::Json).await
    }

    async fn update_point(&self, name: &str, value: PointValue) -> Result<()> {
        let key = self.keys.reading(&self.device, name);
        let unit = value.kind().unit();
        let reading = PointReading::new(self.device.as_str(), name, value).with_label("unit", unit);
        let payload = encode(&reading, self.format)?;
        self.put(&key, payload, self.format).await
    }
}

/// Write commands received over Zenoh.
pub struct ZenohCommands {
    subscriber: Subscriber<FifoChannelHandler<Sample>>,
    keys: KeyExprBuilder,
    device: String,
}

impl ZenohCommands {
    fn parse(&self, sample: &Sample) -> Option<WriteCommand> {
        let key = sample.key_expr().as_str();
        let parsed = match self.keys.parse_command(key) {
            Some(parsed) if parsed.device == self.device => parsed,
            _ => {
                warn!(key = %key, "Ignoring command on unexpected key");
                return None;
            }
        };

        let format = Format::from_mime_type(&sample.encoding().to_string());
        let payload = sample.payload().to_bytes();
        match parse_command_payload_as(&payload, format) {
            Some(level) => Some(WriteCommand::new(parsed.point, level)),
            None => {
                warn!(key = %key, "Ignoring malformed command payload");
                None
            }
        }
    }
}

impl CommandSource for ZenohCommands {
    async fn next_command(&mut self) -> Option<WriteCommand> {
        loop {
            let sample = self.subscriber.recv_async().await.ok()?;
            if let Some(command) = self.parse(&sample) {
                return Some(command);
            }
        }
    }
}

/// Parse a command payload of unknown encoding.
pub fn parse_command_payload(payload: &[u8]) -> Option<f64> {
    parse_command_payload_as(payload, None)
}

/// Parse a command payload, using `format` when the host announced one.
pub fn parse_command_payload_as(payload: &[u8], format: Option<Format>) -> Option<f64> {
    let decoded = match format {
        Some(format) => decode::<CommandPayload>(payload, format),
        None => decode_auto::<CommandPayload>(payload),
    };
    decoded
        .ok()
        .map(CommandPayload::level)
        .filter(|level| level.is_finite())
}
