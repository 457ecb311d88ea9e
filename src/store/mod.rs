//! Storage seams for the shared trigger flag and the sample log.
//!
//! The monitor and the manual tester only ever talk to these traits, so the
//! Firebase REST client can be swapped for the in-memory store in tests and
//! dry runs.

pub mod auth;
pub mod firebase;
pub mod memory;

pub use auth::Credentials;
pub use firebase::FirebaseClient;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::sensors::SensorSample;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Value of the shared conversation flag.
///
/// The app only reacts to `start_conversation`; `idle` is the quiescent
/// state. Anything else found in the database is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    StartConversation,
    Idle,
    Other(String),
}

impl FlagValue {
    pub fn as_str(&self) -> &str {
        match self {
            FlagValue::StartConversation => "start_conversation",
            FlagValue::Idle => "idle",
            FlagValue::Other(s) => s,
        }
    }
}

impl From<&str> for FlagValue {
    fn from(s: &str) -> Self {
        match s {
            "start_conversation" => FlagValue::StartConversation,
            "idle" => FlagValue::Idle,
            other => FlagValue::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FlagValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FlagValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Non-string values written by other tools are kept as their JSON text.
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(s) => FlagValue::from(s.as_str()),
            other => FlagValue::Other(other.to_string()),
        })
    }
}

/// Key assigned by the store to an appended sample.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleKey(pub String);

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The single shared flag observed by the app.
#[async_trait]
pub trait FlagStore: Send + Sync {
    async fn set_flag(&self, value: &FlagValue) -> Result<()>;

    /// Current value, or `None` if the flag has never been written.
    async fn get_flag(&self) -> Result<Option<FlagValue>>;
}

/// Append-only log of sensor samples.
#[async_trait]
pub trait SampleStore: Send + Sync {
    async fn push_sample(&self, sample: &SensorSample) -> Result<SampleKey>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_value_from_str() {
        assert_eq!(
            FlagValue::from("start_conversation"),
            FlagValue::StartConversation
        );
        assert_eq!(FlagValue::from("idle"), FlagValue::Idle);
        assert_eq!(
            FlagValue::from("paused"),
            FlagValue::Other("paused".to_string())
        );
    }

    #[test]
    fn test_flag_value_serializes_as_plain_string() {
        assert_eq!(
            serde_json::to_string(&FlagValue::StartConversation).unwrap(),
            "\"start_conversation\""
        );
        assert_eq!(
            serde_json::to_string(&FlagValue::Other("x".into())).unwrap(),
            "\"x\""
        );
    }

    #[test]
    fn test_flag_value_passes_unknown_values_through() {
        let v: FlagValue = serde_json::from_str("\"custom\"").unwrap();
        assert_eq!(v, FlagValue::Other("custom".into()));

        let v: FlagValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, FlagValue::Other("42".into()));

        let v: Option<FlagValue> = serde_json::from_str("null").unwrap();
        assert_eq!(v, None);
    }
}
