//! Satellite Siege simulation library
//!
//! A tick-based strategy simulation: planets produce satellites, satellites
//! fly under steering forces to capture, reinforce or attack planets, and
//! opposing satellites destroy each other on contact.
//!
//! # Features
//!
//! - `metrics_extended` - per-team satellite gauges and collision tree stats (enabled by default)

pub mod config;
pub mod game;
pub mod host;
pub mod metrics;
pub mod util;
