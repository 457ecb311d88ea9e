//! Conversation Trigger Bridge library.
//!
//! Polls motion and humidity sensors, logs every reading to a Firebase
//! Realtime Database and raises a shared `conversation_trigger` flag on new
//! motion so a companion app can start a conversation.

pub mod clock;
pub mod config;
pub mod error;
pub mod input;
pub mod monitor;
pub mod sensors;
pub mod store;
pub mod tester;
pub mod trigger;
