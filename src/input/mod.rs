//! Input sources that feed readings into the monitor.
//!
//! Current input sources:
//! - `simulation`: random motion with a fixed humidity, for development

pub mod simulation;

pub use simulation::SimulatedSensors;
