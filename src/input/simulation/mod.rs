//! Simulated sensors for development and testing.

mod sensors;

pub use sensors::SimulatedSensors;
