//! Sensor polling loop.
//!
//! Each tick reads the sensors, appends a sample, and feeds the motion
//! reading through the trigger detector. Failures inside a tick are logged
//! and the loop carries on; only startup failures are fatal.

use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::sensors::{DEFAULT_READING, SensorReading, SensorSample, SensorSource};
use crate::store::{FlagStore, FlagValue, SampleKey, SampleStore};
use crate::trigger::{FlagSignaler, SuppressReason, TriggerDecision, TriggerPhase, TriggerState};
use chrono::Local;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub cycle: u64,
    pub reading: SensorReading,
    /// The sensors failed and the default reading was used.
    pub used_default: bool,
    /// Key of the stored sample, `None` if the write failed.
    pub sample_key: Option<SampleKey>,
    pub decision: TriggerDecision,
}

pub struct Monitor {
    sensors: Box<dyn SensorSource>,
    samples: Arc<dyn SampleStore>,
    flags: Arc<dyn FlagStore>,
    signaler: FlagSignaler,
    state: TriggerState,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
    cycle: u64,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        sensors: Box<dyn SensorSource>,
        samples: Arc<dyn SampleStore>,
        flags: Arc<dyn FlagStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sensors,
            samples,
            signaler: FlagSignaler::new(flags.clone(), config.settle_delay()),
            flags,
            state: TriggerState::new(config.cooldown()),
            clock,
            config,
            cycle: 0,
        }
    }

    pub fn state(&self) -> &TriggerState {
        &self.state
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Detector phase, or `FlagActive` while a reset to `idle` is pending.
    pub fn phase(&self) -> TriggerPhase {
        if self.signaler.is_active() {
            TriggerPhase::FlagActive
        } else {
            self.state.phase(self.clock.elapsed())
        }
    }

    /// Report the current flag and put it into a known `idle` state.
    ///
    /// A failed read is only logged; a failed `idle` write aborts startup.
    pub async fn startup(&mut self) -> Result<()> {
        match self.flags.get_flag().await {
            Ok(Some(value)) => info!("[Monitor] Current trigger status: {}", value),
            Ok(None) => info!("[Monitor] Trigger flag not set yet"),
            Err(e) => warn!("[Monitor] Could not read trigger status: {}", e),
        }

        self.flags.set_flag(&FlagValue::Idle).await?;
        info!("[Monitor] Trigger flag initialised to {}", FlagValue::Idle);
        Ok(())
    }

    /// Run one sample → persist → evaluate cycle.
    pub async fn tick(&mut self) -> Result<TickReport> {
        self.cycle += 1;

        let (reading, used_default) = match self.sensors.read() {
            Ok(reading) => (reading, false),
            Err(e) => {
                error!("[Monitor] Sensor read error: {}", e);
                (DEFAULT_READING, true)
            }
        };

        let sample = SensorSample::new(reading, Local::now());
        let sample_key = match self.samples.push_sample(&sample).await {
            Ok(key) => {
                info!(
                    "[Monitor] Sample stored: motion={}, humidity={}",
                    u8::from(reading.motion),
                    reading.humidity
                );
                Some(key)
            }
            Err(e) => {
                error!("[Monitor] Failed to store sample: {}", e);
                None
            }
        };

        let now = self.clock.elapsed();
        let decision = self.state.evaluate(reading.motion, now);
        match decision {
            TriggerDecision::Fire => {
                info!("[Trigger] New motion detected, sending conversation trigger");
                self.signaler.fire().await?;
            }
            TriggerDecision::Suppressed(SuppressReason::MotionHeld) => {
                debug!("[Trigger] Motion still present, no new edge");
            }
            TriggerDecision::Suppressed(SuppressReason::Cooldown { remaining }) => {
                debug!("[Trigger] Motion edge during cooldown ({:?} left)", remaining);
            }
            TriggerDecision::Quiet => {}
        }

        if self.config.status_every > 0 && self.cycle % self.config.status_every == 0 {
            info!(
                "[Monitor] Cycle {}, motion={}, phase={:?}",
                self.cycle,
                u8::from(reading.motion),
                self.phase()
            );
        }

        Ok(TickReport {
            cycle: self.cycle,
            reading,
            used_default,
            sample_key,
            decision,
        })
    }

    /// Initialise the flag, then tick until `shutdown` is cancelled.
    ///
    /// A tick that fails outright is logged and followed by the error
    /// backoff before polling resumes. On the way out any pending reset is
    /// awaited so the flag is left `idle`.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        self.startup().await?;

        info!("[Monitor] Sensor monitoring started");
        info!("  - Tick interval: {:?}", self.config.tick_interval());
        info!("  - Trigger cooldown: {:?}", self.config.cooldown());
        info!("  - Stop: Ctrl+C");

        let period = self.config.tick_interval().max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.tick().await {
                error!(
                    "[Monitor] Monitoring error: {}; retrying in {:?}",
                    e,
                    self.config.error_backoff()
                );
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.config.error_backoff()) => {}
                }
            }
        }

        info!("[Monitor] Sensor monitoring stopped after {} cycles", self.cycle);
        if let Err(e) = self.signaler.settle().await {
            warn!("[Monitor] Pending trigger reset did not complete: {}", e);
        }
        Ok(())
    }

    /// One manual start → idle cycle, without sampling.
    pub async fn manual_pulse(&mut self) -> Result<()> {
        info!("[Monitor] Manual trigger test");
        self.signaler.pulse().await
    }
}
