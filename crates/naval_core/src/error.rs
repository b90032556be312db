//! Error types for the battle simulation.

use thiserror::Error;

use crate::ids::ShipId;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for all simulation commands.
///
/// Internal inconsistencies (priority queue underflow, heap index
/// corruption) are not represented here: they panic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A command argument was rejected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No ship class with this tag exists in the catalog.
    #[error("Unknown ship class: {0}")]
    UnknownShipClass(String),

    /// A world point lies outside the playable area.
    #[error("Point ({x:.1}, {y:.1}) is outside the playable area")]
    PointOutsideMap {
        /// World x coordinate.
        x: f64,
        /// World y coordinate.
        y: f64,
    },

    /// A world point lies on an island or another untraversable cell.
    #[error("Point ({x:.1}, {y:.1}) is obstructed")]
    PositionObstructed {
        /// World x coordinate.
        x: f64,
        /// World y coordinate.
        y: f64,
    },

    /// The pathfinder exhausted its open set without reaching the goal.
    #[error("No path from cell {from:?} to cell {to:?}")]
    NoPath {
        /// Start cell as (row, column).
        from: (usize, usize),
        /// Goal cell as (row, column).
        to: (usize, usize),
    },

    /// The ship id does not resolve (never existed or was removed).
    #[error("Ship not found: {0}")]
    ShipNotFound(ShipId),

    /// A configuration document could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),
}

impl From<ron::error::SpannedError> for SimError {
    fn from(err: ron::error::SpannedError) -> Self {
        Self::ConfigParse(err.to_string())
    }
}
