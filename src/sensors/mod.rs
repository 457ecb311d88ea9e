//! Sensor readings and the source abstraction the monitor samples from.
//!
//! Real drivers (DHT22 humidity, PIR motion, ...) implement [`SensorSource`];
//! the monitor never needs to know which one it is talking to.

use crate::error::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize, Serializer};

/// Reading substituted whenever a source fails.
pub const DEFAULT_READING: SensorReading = SensorReading {
    humidity: 50.0,
    motion: false,
};

/// Timestamp layout stored alongside each sample.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One raw reading from the sensors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Relative humidity (%)
    pub humidity: f64,
    /// Whether the motion sensor currently sees movement
    pub motion: bool,
}

/// Source of sensor readings.
///
/// `read` is called once per tick. Errors are never fatal: the monitor
/// logs them and falls back to [`DEFAULT_READING`].
pub trait SensorSource: Send {
    fn read(&mut self) -> Result<SensorReading>;
}

/// Record appended to the sample log once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub humidity: f64,
    /// Stored as 0/1, which is what the app and dashboards read.
    #[serde(serialize_with = "motion_as_int", deserialize_with = "motion_from_int")]
    pub motion: bool,
    pub timestamp: String,
}

impl SensorSample {
    pub fn new(reading: SensorReading, at: DateTime<Local>) -> Self {
        Self {
            humidity: reading.humidity,
            motion: reading.motion,
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

fn motion_as_int<S>(motion: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u8(u8::from(*motion))
}

fn motion_from_int<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Motion {
        Int(u8),
        Bool(bool),
    }

    Ok(match Motion::deserialize(deserializer)? {
        Motion::Int(v) => v != 0,
        Motion::Bool(b) => b,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sample_wire_format() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 5).unwrap();
        let sample = SensorSample::new(
            SensorReading {
                humidity: 55.0,
                motion: true,
            },
            at,
        );

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "humidity": 55.0,
                "motion": 1,
                "timestamp": "2024-05-01 09:30:05",
            })
        );
    }

    #[test]
    fn test_sample_accepts_boolean_motion() {
        let sample: SensorSample = serde_json::from_str(
            r#"{"humidity": 40, "motion": true, "timestamp": "2024-05-01 09:30:05"}"#,
        )
        .unwrap();
        assert!(sample.motion);
        assert_eq!(sample.humidity, 40.0);
    }

    #[test]
    fn test_default_reading() {
        assert_eq!(DEFAULT_READING.humidity, 50.0);
        assert!(!DEFAULT_READING.motion);
    }
}
