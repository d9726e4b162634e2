//! Error types for truck packing.

use thiserror::Error;

/// Result type alias for packing operations.
pub type Result<T> = std::result::Result<T, PackError>;

/// Errors that can occur while packing a truck.
///
/// All variants propagate unmodified to the caller. Nothing inside the
/// crate retries or recovers from them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackError {
    /// No grid under the voxel budget keeps every scaled box inside the truck.
    #[error("Grid search failed: {0}")]
    GridSearch(String),

    /// The input cannot form a valid model (e.g. a box with no feasible
    /// placement), or the solver rejected the model itself.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// The solver proved that no arrangement satisfies all constraints.
    #[error("No packing satisfies all constraints")]
    Infeasible,

    /// The time budget ran out before any feasible arrangement was found.
    #[error("Time limit of {0}ms exhausted before a packing was found")]
    Timeout(u64),

    /// The solver reported success but its assignment cannot be decoded.
    #[error("Internal consistency failure: {0}")]
    InternalConsistency(String),
}

impl PackError {
    /// Whether this error stems from the caller's input rather than the search.
    pub fn is_input_error(&self) -> bool {
        matches!(self, PackError::GridSearch(_) | PackError::InvalidModel(_))
    }
}
