//! In-memory stand-in for the realtime database.
//!
//! Backs `--dry-run` and the tests. Every flag write is recorded with the
//! time it happened so write ordering and spacing can be checked.

use super::{FlagStore, FlagValue, SampleKey, SampleStore};
use crate::error::{BridgeError, Result};
use crate::sensors::SensorSample;
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::Instant;

#[derive(Default)]
struct Inner {
    flag: Option<FlagValue>,
    flag_writes: Vec<(Instant, FlagValue)>,
    samples: Vec<(SampleKey, SensorSample)>,
}

/// Thread-safe in-memory flag and sample store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_flag_writes: AtomicBool,
    fail_sample_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the flag already holding `value`.
    pub fn with_flag(value: FlagValue) -> Self {
        let store = Self::default();
        store.inner.lock().flag = Some(value);
        store
    }

    /// Make subsequent flag writes fail until switched off again.
    pub fn fail_flag_writes(&self, fail: bool) {
        self.fail_flag_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent sample pushes fail until switched off again.
    pub fn fail_sample_writes(&self, fail: bool) {
        self.fail_sample_writes.store(fail, Ordering::SeqCst);
    }

    pub fn current_flag(&self) -> Option<FlagValue> {
        self.inner.lock().flag.clone()
    }

    /// Successful flag writes in the order they happened.
    pub fn flag_writes(&self) -> Vec<FlagValue> {
        self.inner
            .lock()
            .flag_writes
            .iter()
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Successful flag writes with the instant each one landed.
    pub fn timed_flag_writes(&self) -> Vec<(Instant, FlagValue)> {
        self.inner.lock().flag_writes.clone()
    }

    pub fn samples(&self) -> Vec<(SampleKey, SensorSample)> {
        self.inner.lock().samples.clone()
    }
}

fn injected(what: &str) -> BridgeError {
    BridgeError::IoError(std::io::Error::other(format!("injected {what} failure")))
}

#[async_trait]
impl FlagStore for MemoryStore {
    async fn set_flag(&self, value: &FlagValue) -> Result<()> {
        if self.fail_flag_writes.load(Ordering::SeqCst) {
            return Err(injected("flag write"));
        }
        debug!("[Memory] flag <- {}", value);
        let mut inner = self.inner.lock();
        inner.flag = Some(value.clone());
        inner.flag_writes.push((Instant::now(), value.clone()));
        Ok(())
    }

    async fn get_flag(&self) -> Result<Option<FlagValue>> {
        Ok(self.current_flag())
    }
}

#[async_trait]
impl SampleStore for MemoryStore {
    async fn push_sample(&self, sample: &SensorSample) -> Result<SampleKey> {
        if self.fail_sample_writes.load(Ordering::SeqCst) {
            return Err(injected("sample write"));
        }
        let mut inner = self.inner.lock();
        // Zero padded so lexical order matches insertion order, like push ids.
        let key = SampleKey(format!("{:012}", inner.samples.len()));
        inner.samples.push((key.clone(), sample.clone()));
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(motion: bool) -> SensorSample {
        SensorSample {
            humidity: 55.0,
            motion,
            timestamp: "2024-05-01 09:30:05".to_string(),
        }
    }

    #[tokio::test]
    async fn test_flag_roundtrip_and_history() {
        let store = MemoryStore::new();
        assert_eq!(store.get_flag().await.unwrap(), None);

        store.set_flag(&FlagValue::StartConversation).await.unwrap();
        store.set_flag(&FlagValue::Idle).await.unwrap();

        assert_eq!(store.get_flag().await.unwrap(), Some(FlagValue::Idle));
        assert_eq!(
            store.flag_writes(),
            vec![FlagValue::StartConversation, FlagValue::Idle]
        );
    }

    #[tokio::test]
    async fn test_sample_keys_preserve_order() {
        let store = MemoryStore::new();
        let k1 = store.push_sample(&sample(false)).await.unwrap();
        let k2 = store.push_sample(&sample(true)).await.unwrap();
        assert!(k1 < k2);
        assert_eq!(store.samples().len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures_leave_state_untouched() {
        let store = MemoryStore::with_flag(FlagValue::Idle);
        store.fail_flag_writes(true);
        store.fail_sample_writes(true);

        assert!(store.set_flag(&FlagValue::StartConversation).await.is_err());
        assert!(store.push_sample(&sample(true)).await.is_err());
        assert_eq!(store.current_flag(), Some(FlagValue::Idle));
        assert!(store.flag_writes().is_empty());
        assert!(store.samples().is_empty());

        store.fail_flag_writes(false);
        tokio_test::assert_ok!(store.set_flag(&FlagValue::StartConversation).await);
    }
}
