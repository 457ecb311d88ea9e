//! Manual trigger harness.
//!
//! Talks to the shared flag directly, with no sensor sampling or edge
//! detection, so the app side can be checked by hand.

use crate::error::{BridgeError, Result};
use crate::store::{FlagStore, FlagValue};
use crate::trigger;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Entries of the interactive menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Pulse,
    RepeatPulse,
    ReadFlag,
    ResetFlag,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 4] = [
        MenuChoice::Pulse,
        MenuChoice::RepeatPulse,
        MenuChoice::ReadFlag,
        MenuChoice::ResetFlag,
    ];

    pub fn parse(input: &str) -> Result<Self> {
        match input.trim() {
            "1" => Ok(MenuChoice::Pulse),
            "2" => Ok(MenuChoice::RepeatPulse),
            "3" => Ok(MenuChoice::ReadFlag),
            "4" => Ok(MenuChoice::ResetFlag),
            other => Err(BridgeError::InvalidInput(format!(
                "unknown menu choice {other:?}"
            ))),
        }
    }

    pub fn number(self) -> u8 {
        match self {
            MenuChoice::Pulse => 1,
            MenuChoice::RepeatPulse => 2,
            MenuChoice::ReadFlag => 3,
            MenuChoice::ResetFlag => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuChoice::Pulse => "Manual trigger test",
            MenuChoice::RepeatPulse => "Repeated trigger test",
            MenuChoice::ReadFlag => "Read current value",
            MenuChoice::ResetFlag => "Reset trigger to idle",
        }
    }
}

/// Parse the repeat interval prompt; empty input means `default`.
pub fn parse_interval(input: &str, default: Duration) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(default);
    }
    let secs: u64 = input
        .parse()
        .map_err(|_| BridgeError::InvalidInput(format!("interval {input:?} is not a number")))?;
    if secs == 0 {
        return Err(BridgeError::InvalidInput(
            "interval must be at least 1 second".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

pub struct ManualTrigger {
    flags: Arc<dyn FlagStore>,
    settle_delay: Duration,
}

impl ManualTrigger {
    pub fn new(flags: Arc<dyn FlagStore>, settle_delay: Duration) -> Self {
        Self {
            flags,
            settle_delay,
        }
    }

    pub async fn set(&self, value: &FlagValue) -> Result<()> {
        self.flags.set_flag(value).await?;
        info!("[Tester] Trigger value set: {}", value);
        Ok(())
    }

    pub async fn get(&self) -> Result<Option<FlagValue>> {
        let value = self.flags.get_flag().await?;
        match &value {
            Some(v) => info!("[Tester] Current trigger value: {}", v),
            None => info!("[Tester] Current trigger value: <unset>"),
        }
        Ok(value)
    }

    /// Report the current value, then run a full start → idle cycle.
    pub async fn pulse(&self) -> Result<()> {
        info!("[Tester] Manual trigger test starting");
        if let Err(e) = self.get().await {
            error!("[Tester] Could not read current value: {}", e);
        }
        trigger::pulse(self.flags.as_ref(), self.settle_delay).await?;
        info!("[Tester] Test complete, the app should have started a conversation");
        Ok(())
    }

    /// Pulse every `interval` until `shutdown` is cancelled.
    ///
    /// Cancellation is honoured between pulses, so an in-flight pulse always
    /// finishes with the flag back at `idle`. Failed pulses are logged and the
    /// loop continues. Returns the number of pulses attempted.
    pub async fn repeat(&self, interval: Duration, shutdown: CancellationToken) -> u64 {
        info!("[Tester] Sending a trigger every {:?} (Ctrl+C to stop)", interval);
        let mut count = 0;
        loop {
            if shutdown.is_cancelled() {
                break;
            }
            if let Err(e) = self.pulse().await {
                error!("[Tester] Trigger test failed: {}", e);
            }
            count += 1;

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        info!("[Tester] Repeated test stopped after {} pulses", count);
        count
    }
}
