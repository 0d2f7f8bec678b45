//! Error types for Synheart Stress
//!
//! The engine itself never fails; these errors cover the edges around it
//! (parsing, configuration, state restore, encoding and session routing).

use thiserror::Error;

/// Errors that can occur around the stress engine
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse sample payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Engine state does not match configuration: {0}")]
    StateMismatch(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Chunk contains no samples")]
    EmptyChunk,
}
