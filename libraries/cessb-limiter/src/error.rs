//! Error types for envelope limiting

use thiserror::Error;

/// Result type for limiter operations
pub type Result<T> = std::result::Result<T, LimiterError>;

/// Errors that can occur while configuring or driving a limiter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LimiterError {
    /// Target envelope is zero, negative or not finite
    #[error("Invalid target envelope: {0} (must be finite and > 0)")]
    InvalidTarget(f64),

    /// Block size of zero
    #[error("Invalid block size: {0} (must be > 0)")]
    InvalidBlockSize(usize),

    /// Lookahead depth of zero
    #[error("Invalid lookahead depth: {0} (must be > 0)")]
    InvalidLookaheadDepth(usize),

    /// Hard-clip ceiling not strictly above the target
    #[error("Invalid hard-clip ceiling: {ceiling} (must be finite and > target {target})")]
    InvalidCeiling {
        /// Requested ceiling
        ceiling: f64,
        /// Configured target envelope
        target: f64,
    },

    /// Pushed block does not match the configured block size
    #[error("Block length mismatch: expected {expected} samples, got {actual}")]
    BlockLength {
        /// Configured block size
        expected: usize,
        /// Length of the rejected block
        actual: usize,
    },

    /// Input holds a NaN or infinite component
    #[error("Non-finite sample at index {index}")]
    NonFiniteSample {
        /// Position of the first offending sample (pair index for interleaved input)
        index: usize,
    },

    /// Interleaved buffer does not hold whole (i, q) pairs
    #[error("Interleaved buffer has odd length {0} (expected i/q pairs)")]
    InterleavedLength(usize),

    /// Push attempted after the stream started draining
    #[error("Limiter has been flushed; call reset() before pushing again")]
    Flushed,

    /// Scratch buffer could not be allocated
    #[error("Scratch allocation failed: {0}")]
    Allocation(String),
}

impl From<std::collections::TryReserveError> for LimiterError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::Allocation(err.to_string())
    }
}
