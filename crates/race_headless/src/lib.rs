//! Headless race runner for CI verification and scripted playback.
//!
//! This crate drives a [`race_core::simulation::Simulation`] without any
//! presentation layer, either for a fixed number of ticks or from JSON
//! commands on stdin. This enables:
//!
//! - **CI verification**: re-run a scenario and compare state hashes
//! - **Scripted playback**: feed activation and weather commands, read events
//! - **Benchmarking**: time the tick loop on realistic arenas
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (tick, activate, set_weather, ...)
//! - **stdout**: Events, snapshots and hashes (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command/response specification.
//!
//! # Example
//!
//! ```bash
//! # Run the demo arena for its default length
//! cargo run -p race_headless -- run --scenario demo
//!
//! # Drive a race interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p race_headless -- serve
//!
//! # Verify determinism
//! cargo run -p race_headless -- verify --scenario scenarios/my_arena.ron --runs 5
//! ```

pub mod protocol;
pub mod runner;
pub mod scenario;

pub use protocol::{Command, Response};
pub use runner::{verify_determinism, HeadlessConfig, HeadlessRunner, VerifyReport};
pub use scenario::{Scenario, ScenarioError};
