//! Error types for the race simulation.

use thiserror::Error;

use crate::components::RacerId;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for the race simulation.
///
/// Geometry and collision code never fails: degenerate input yields no
/// contact. Errors only surface at the configuration and command boundary.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    /// A command referenced a racer that does not exist.
    #[error("Invalid racer ID: {0}")]
    InvalidRacerId(RacerId),

    /// Race setup text could not be parsed.
    #[error("Failed to parse race setup: {0}")]
    ConfigParse(String),

    /// Race setup parsed but holds unusable values.
    #[error("Invalid race configuration: {0}")]
    InvalidConfig(String),
}
