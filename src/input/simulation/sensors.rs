//! Sensor simulation for testing.
//!
//! Stands in for a DHT22 humidity sensor and a PIR motion sensor until real
//! drivers are wired up.

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::sensors::{SensorReading, SensorSource};
use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Simulated sensor pair.
///
/// Humidity is constant; motion is drawn independently each read with the
/// configured probability (25% by default).
pub struct SimulatedSensors {
    humidity: f64,
    motion_probability: f64,
    rng: StdRng,
}

impl SimulatedSensors {
    pub fn new(config: &SimulationConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic variant for tests and reproducible runs.
    pub fn seeded(config: &SimulationConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &SimulationConfig, rng: StdRng) -> Self {
        Self {
            humidity: config.humidity,
            motion_probability: config.motion_probability.clamp(0.0, 1.0),
            rng,
        }
    }
}

impl SensorSource for SimulatedSensors {
    fn read(&mut self) -> Result<SensorReading> {
        let motion = self.rng.gen_bool(self.motion_probability);
        trace!("[Sim] humidity={} motion={}", self.humidity, motion);
        Ok(SensorReading {
            humidity: self.humidity,
            motion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(probability: f64) -> SimulationConfig {
        SimulationConfig {
            motion_probability: probability,
            humidity: 55.0,
        }
    }

    #[test]
    fn test_humidity_is_constant() {
        let mut sensors = SimulatedSensors::seeded(&config(0.25), 7);
        for _ in 0..20 {
            assert_eq!(sensors.read().unwrap().humidity, 55.0);
        }
    }

    #[test]
    fn test_probability_extremes() {
        let mut never = SimulatedSensors::seeded(&config(0.0), 1);
        let mut always = SimulatedSensors::seeded(&config(1.0), 1);
        for _ in 0..50 {
            assert!(!never.read().unwrap().motion);
            assert!(always.read().unwrap().motion);
        }
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let mut a = SimulatedSensors::seeded(&config(0.25), 42);
        let mut b = SimulatedSensors::seeded(&config(0.25), 42);
        let seq_a: Vec<bool> = (0..32).map(|_| a.read().unwrap().motion).collect();
        let seq_b: Vec<bool> = (0..32).map(|_| b.read().unwrap().motion).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_out_of_range_probability_is_clamped() {
        let mut sensors = SimulatedSensors::seeded(&config(3.0), 1);
        assert!(sensors.read().unwrap().motion);
    }
}
