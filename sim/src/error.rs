//! Error types for maze generation and the chase simulation.

use thiserror::Error;

/// Result type alias for maze operations.
pub type MazeResult<T> = Result<T, MazeError>;

/// Errors that can occur while building or running a maze world.
#[derive(Debug, Error)]
pub enum MazeError {
    /// A configuration value is outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The requested carve start lies outside the grid.
    #[error("start cell ({column}, {row}) is outside a {width}x{height} maze")]
    StartOutOfBounds {
        column: usize,
        row: usize,
        width: usize,
        height: usize,
    },

    /// No spawn spot satisfied the constraints within the retry budget.
    #[error("no spawn spot found after {attempts} attempts (min distance {min_distance})")]
    SpawnUnavailable { attempts: u32, min_distance: f32 },

    /// Configuration or snapshot JSON could not be (de)serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MazeError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig(details.into())
    }
}
