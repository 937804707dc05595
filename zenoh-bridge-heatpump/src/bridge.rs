//! Bridge runtime: one controller task for polls and writes.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::config::HeatPumpConfig;
use crate::dispatcher::{CommandDispatcher, DispatchOutcome};
use crate::error::Result;
use crate::lang::Language;
use crate::registers::POINTS;
use crate::registry::{CommandSource, HostRegistry, WriteCommand};
use crate::scheduler::{PollScheduler, TickOutcome};
use crate::transport::Transport;

/// Owns the bus, the host registry and all scheduling state.
///
/// Ticks and commands are handled one at a time by [`HeatPumpBridge::run`],
/// so a poll and a write never share the bus.
pub struct HeatPumpBridge<T, R> {
    transport: T,
    registry: R,
    scheduler: PollScheduler,
    dispatcher: CommandDispatcher,
    language: Language,
}

impl<T, R> HeatPumpBridge<T, R>
where
    T: Transport,
    R: HostRegistry,
{
    pub fn new(
        transport: T,
        registry: R,
        scheduler: PollScheduler,
        dispatcher: CommandDispatcher,
        language: Language,
    ) -> Self {
        Self {
            transport,
            registry,
            scheduler,
            dispatcher,
            language,
        }
    }

    pub fn from_config(transport: T, registry: R, config: &HeatPumpConfig) -> Self {
        let scheduler = PollScheduler::new(config.poll_interval_secs, config.retry.read_policy())
            .with_debug(config.debug);
        let dispatcher = CommandDispatcher::new(config.retry.write_policy());
        Self::new(transport, registry, scheduler, dispatcher, config.language())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    /// Announce every point to the host. Returns the number declared.
    pub async fn declare_points(&self) -> Result<usize> {
        for point in &POINTS {
            self.registry
                .create_point(&point.descriptor(self.language))
                .await?;
        }
        info!(count = POINTS.len(), language = %self.language, "Points declared");
        Ok(POINTS.len())
    }

    /// Handle one timer tick.
    pub async fn tick(&mut self) -> TickOutcome {
        self.scheduler
            .on_tick(&self.transport, &self.registry)
            .await
    }

    /// Handle one host write command.
    pub async fn handle_command(&self, command: &WriteCommand) -> DispatchOutcome {
        self.dispatcher
            .dispatch(&self.transport, &self.registry, command)
            .await
    }

    /// Poll on the scheduler's timer and serve commands until cancelled.
    ///
    /// A closed command source stops command handling; polling continues.
    pub async fn run<C: CommandSource>(&mut self, mut commands: C) {
        let mut ticker = ticker(self.scheduler.period());
        let mut commands_open = true;

        info!(period_secs = self.scheduler.period().as_secs(), "Polling started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.tick().await;
                    if let Some(secs) = outcome.reprogram {
                        debug!(period_secs = secs, "Re-programming poll timer");
                        ticker = ticker_secs(secs);
                    }
                }
                command = commands.next_command(), if commands_open => match command {
                    Some(command) => {
                        debug!(point = %command.point, level = command.level, "Write command received");
                        self.handle_command(&command).await;
                    }
                    None => {
                        info!("Command source closed, polling only");
                        commands_open = false;
                    }
                },
            }
        }
    }
}

fn ticker_secs(secs: u64) -> Interval {
    ticker(Duration::from_secs(secs))
}

/// Interval whose first tick is one full period away.
fn ticker(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
