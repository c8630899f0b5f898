//! # Display Error Types
//!
//! None of these are fatal to the tick path: a rejected spawn only means the
//! companion is not shown this tick.

use companion_shared::ActorId;
use thiserror::Error;

/// Errors that can occur in the display engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    /// The entity system refused to spawn a companion.
    #[error("spawn rejected for {actor}: {reason}")]
    SpawnRejected {
        /// Actor the companion was for.
        actor: ActorId,
        /// Reason given by the entity system.
        reason: String,
    },

    /// Configuration file could not be read.
    #[error("cannot read configuration {path}: {reason}")]
    ConfigRead {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        reason: String,
    },

    /// Configuration is not valid TOML or has wrong types.
    #[error("cannot parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed but holds unusable values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for display operations.
pub type DisplayResult<T> = Result<T, DisplayError>;
