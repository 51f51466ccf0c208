//! JSON protocol for headless race sessions.
//!
//! The runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from a controller or test script
//! **Output (stdout):** Tick events, snapshots and hashes
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner outputs events for every tick that had any
//! 4. On `quit` or end of input, outputs `{"type":"bye"}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","scenario":"demo","racers":24,"tick":0}
//! -> {"cmd":"activate","racer":3}
//! <- {"type":"ack","cmd":"activate"}
//! -> {"cmd":"tick","count":60}
//! <- {"type":"tick","tick":1,"time_ms":16,"events":{"collisions":[],...}}
//! -> {"cmd":"set_weather","weather":{"kind":"Rain","intensity":0.5}}
//! <- {"type":"ack","cmd":"set_weather"}
//! -> {"cmd":"hash"}
//! <- {"type":"state_hash","tick":60,"hash":1234567890}
//! ```

use race_core::components::{RacerId, RacerSnapshot};
use race_core::environment::Weather;
use race_core::events::TickEvents;
use serde::{Deserialize, Serialize};

/// Protocol version reported in [`Response::Ready`].
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the race by N ticks (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Ask a racer to use its ability now.
    Activate { racer: RacerId },

    /// Replace the weather from the next tick on.
    SetWeather { weather: Weather },

    /// Report every racer without advancing time.
    Snapshot,

    /// Report the current state hash.
    Hash,

    /// End the session.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        version: String,
        scenario: String,
        racers: usize,
        tick: u64,
    },

    /// Acknowledgment of a command.
    Ack { cmd: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Everything that happened during one tick.
    Tick {
        tick: u64,
        time_ms: u64,
        events: TickEvents,
    },

    /// Every racer as of `tick`.
    Snapshot {
        tick: u64,
        time_ms: u64,
        racers: Vec<RacerSnapshot>,
    },

    /// State hash for determinism verification.
    StateHash { tick: u64, hash: u64 },

    /// A scripted run finished.
    Done { ticks: u64, hash: u64 },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(scenario: &str, racers: usize, tick: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            scenario: scenario.to_string(),
            racers,
            tick,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Activate { .. } => "activate",
            Self::SetWeather { .. } => "set_weather",
            Self::Snapshot => "snapshot",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}
