//! Error types for buildplan.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A reference between entities is broken or an entity is malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A `${...}` placeholder could not be resolved.
    #[error("cannot resolve placeholder '{name}': {message}")]
    PlaceholderResolution { name: String, message: String },

    /// A requirement predicate is malformed.
    #[error("invalid requirement: {0}")]
    Validation(String),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn placeholder(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PlaceholderResolution {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
