//! Writes the conversation flag and schedules its reset.

use crate::error::Result;
use crate::store::{FlagStore, FlagValue};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Set the flag to `start_conversation`, wait `settle_delay`, set it back
/// to `idle`. No edge or cooldown gating.
///
/// Returns early with the error if either write fails.
pub async fn pulse(flags: &dyn FlagStore, settle_delay: Duration) -> Result<()> {
    flags.set_flag(&FlagValue::StartConversation).await?;
    info!("[Trigger] Flag set to {}", FlagValue::StartConversation);

    tokio::time::sleep(settle_delay).await;

    flags.set_flag(&FlagValue::Idle).await?;
    info!("[Trigger] Flag reset to {}", FlagValue::Idle);
    Ok(())
}

/// Drives the shared flag for the monitor.
///
/// A fire writes `start_conversation` right away and leaves the `idle`
/// reset to a background task, so the tick loop keeps running during the
/// settle delay. Only one reset is ever outstanding: a new fire waits for
/// the previous reset to land first, which keeps every start/idle pair
/// contiguous on the wire.
pub struct FlagSignaler {
    flags: Arc<dyn FlagStore>,
    settle_delay: Duration,
    pending_reset: Option<JoinHandle<()>>,
}

impl FlagSignaler {
    pub fn new(flags: Arc<dyn FlagStore>, settle_delay: Duration) -> Self {
        Self {
            flags,
            settle_delay,
            pending_reset: None,
        }
    }

    /// Whether a reset to `idle` is still outstanding.
    pub fn is_active(&self) -> bool {
        self.pending_reset
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start a conversation and schedule the reset.
    ///
    /// A failed `start_conversation` write is logged and not retried; no
    /// reset is scheduled for it. Returns whether the flag was set.
    /// The only error surfaced is a crashed reset task from an earlier fire.
    pub async fn fire(&mut self) -> Result<bool> {
        self.settle().await?;

        if let Err(e) = self.flags.set_flag(&FlagValue::StartConversation).await {
            error!("[Trigger] Failed to send conversation trigger: {}", e);
            return Ok(false);
        }
        info!("[Trigger] Conversation trigger sent");

        let flags = self.flags.clone();
        let settle_delay = self.settle_delay;
        self.pending_reset = Some(tokio::spawn(async move {
            tokio::time::sleep(settle_delay).await;
            match flags.set_flag(&FlagValue::Idle).await {
                Ok(()) => info!("[Trigger] Trigger reset to idle"),
                // Stays `start_conversation` until the next successful write.
                Err(e) => error!("[Trigger] Failed to reset trigger to idle: {}", e),
            }
        }));
        Ok(true)
    }

    /// Wait for an outstanding reset, if any.
    pub async fn settle(&mut self) -> Result<()> {
        if let Some(handle) = self.pending_reset.take() {
            handle.await?;
        }
        Ok(())
    }

    /// Full start → idle cycle, bypassing the detector.
    pub async fn pulse(&mut self) -> Result<()> {
        self.settle().await?;
        pulse(self.flags.as_ref(), self.settle_delay).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const SETTLE: Duration = Duration::from_secs(3);

    #[tokio::test(start_paused = true)]
    async fn test_fire_writes_start_then_idle_after_settle() {
        let store = Arc::new(MemoryStore::with_flag(FlagValue::Idle));
        let mut signaler = FlagSignaler::new(store.clone(), SETTLE);

        assert!(signaler.fire().await.unwrap());
        assert_eq!(store.current_flag(), Some(FlagValue::StartConversation));
        assert!(signaler.is_active());

        signaler.settle().await.unwrap();
        assert!(!signaler.is_active());

        let writes = store.timed_flag_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].1, FlagValue::StartConversation);
        assert_eq!(writes[1].1, FlagValue::Idle);
        assert!(writes[1].0 - writes[0].0 >= SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_fires_do_not_interleave() {
        let store = Arc::new(MemoryStore::new());
        let mut signaler = FlagSignaler::new(store.clone(), SETTLE);

        signaler.fire().await.unwrap();
        signaler.fire().await.unwrap();
        signaler.settle().await.unwrap();

        assert_eq!(
            store.flag_writes(),
            vec![
                FlagValue::StartConversation,
                FlagValue::Idle,
                FlagValue::StartConversation,
                FlagValue::Idle,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_start_schedules_nothing() {
        let store = Arc::new(MemoryStore::with_flag(FlagValue::Idle));
        store.fail_flag_writes(true);
        let mut signaler = FlagSignaler::new(store.clone(), SETTLE);

        assert!(!signaler.fire().await.unwrap());
        assert!(!signaler.is_active());
        assert!(store.flag_writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reset_leaves_flag_raised() {
        let store = Arc::new(MemoryStore::new());
        let mut signaler = FlagSignaler::new(store.clone(), SETTLE);

        signaler.fire().await.unwrap();
        store.fail_flag_writes(true);
        signaler.settle().await.unwrap();

        assert_eq!(store.current_flag(), Some(FlagValue::StartConversation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_twice_gives_two_full_cycles() {
        let store = Arc::new(MemoryStore::new());
        let mut signaler = FlagSignaler::new(store.clone(), SETTLE);

        signaler.pulse().await.unwrap();
        signaler.pulse().await.unwrap();

        let writes = store.timed_flag_writes();
        let values: Vec<_> = writes.iter().map(|(_, v)| v.clone()).collect();
        assert_eq!(
            values,
            vec![
                FlagValue::StartConversation,
                FlagValue::Idle,
                FlagValue::StartConversation,
                FlagValue::Idle,
            ]
        );
        assert!(writes[1].0 - writes[0].0 >= SETTLE);
        assert!(writes[3].0 - writes[2].0 >= SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_stops_on_failed_start() {
        let store = MemoryStore::new();
        store.fail_flag_writes(true);
        assert!(pulse(&store, SETTLE).await.is_err());
        assert_eq!(store.current_flag(), None);
    }
}
