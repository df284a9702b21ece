//! Test doubles: a scripted in-memory connection and a UDP mock device.

mod scripted;
mod service;

pub use self::scripted::ScriptedConnection;
pub use self::service::{MOCK_TARGET, MockConfig, MockService};
