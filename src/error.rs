//! Error types for learning-rate controllers.

use thiserror::Error;

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, ControllerError>;

/// Errors that can occur during learning-rate controller operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Invalid configuration parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Number of parameter groups differs from construction.
    #[error("group count mismatch: controller built for {expected} groups, got {actual}")]
    GroupCountMismatch {
        /// Group count at construction.
        expected: usize,
        /// Group count observed in this call.
        actual: usize,
    },

    /// Number of parameters in a group differs from construction.
    #[error("param count mismatch in group {group}: expected {expected}, got {actual}")]
    ParamCountMismatch {
        /// Group index.
        group: usize,
        /// Parameter count at construction.
        expected: usize,
        /// Parameter count observed in this call.
        actual: usize,
    },

    /// Gradient shape differs from the buffer allocated at construction.
    #[error("shape mismatch for group {group} param {param}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Group index.
        group: usize,
        /// Parameter index within the group.
        param: usize,
        /// Buffer shape.
        expected: Vec<usize>,
        /// Gradient shape.
        actual: Vec<usize>,
    },

    /// Required optimizer-internal state is absent or not yet populated.
    #[error("optimizer state unavailable for group {group} param {param}: {what}")]
    MissingState {
        /// Group index.
        group: usize,
        /// Parameter index within the group.
        param: usize,
        /// Which piece of state was expected.
        what: &'static str,
    },

    /// Candle tensor operation error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}
