//! Host write commands to register writes.

use tracing::{debug, error, info, warn};

use crate::registers::find_point;
use crate::registry::{HostRegistry, WriteCommand};
use crate::retry::{AggregateError, RetryPolicy};
use crate::transport::Transport;

/// How a command was handled.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// No point with that name.
    UnknownPoint,
    /// The point is a measurement; the bus was not touched.
    ReadOnly,
    Written { raw: u16 },
    Failed { raw: u16, error: AggregateError },
}

#[derive(Debug, Clone, Copy)]
pub struct CommandDispatcher {
    write_policy: RetryPolicy,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new(RetryPolicy::write())
    }
}

impl CommandDispatcher {
    pub fn new(write_policy: RetryPolicy) -> Self {
        Self { write_policy }
    }

    /// Encode and write one command.
    ///
    /// The requested level is pushed to the registry after the write attempt
    /// whether or not the write succeeded.
    pub async fn dispatch<T, R>(
        &self,
        transport: &T,
        registry: &R,
        command: &WriteCommand,
    ) -> DispatchOutcome
    where
        T: Transport,
        R: HostRegistry,
    {
        let Some(point) = find_point(&command.point) else {
            warn!(point = %command.point, "Write to unknown point");
            return DispatchOutcome::UnknownPoint;
        };

        if !point.is_writable() {
            debug!(point = point.name, address = point.address, "Ignoring write to read-only point");
            return DispatchOutcome::ReadOnly;
        }

        let raw = point.encoding.encode(command.level);
        let address = point.address;
        let result = self
            .write_policy
            .run(move |attempt| transport.write_register(address, raw, attempt.exclusive))
            .await;

        let outcome = match result {
            Ok(()) => {
                info!(point = point.name, level = command.level, raw, "Register written");
                DispatchOutcome::Written { raw }
            }
            Err(e) => {
                error!(point = point.name, level = command.level, raw, error = %e, "Register write failed");
                DispatchOutcome::Failed { raw, error: e }
            }
        };

        let requested = point.encoding.requested_value(command.level);
        if let Err(e) = registry.update_point(point.name, requested).await {
            warn!(point = point.name, error = %e, "Failed to update point");
        }

        outcome
    }
}
