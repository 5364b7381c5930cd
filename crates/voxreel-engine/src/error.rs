//! Engine error types.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No clip survived loading for group {group}")]
    EmptyPool { group: usize },

    #[error("Media error: {0}")]
    Media(#[from] voxreel_media::MediaError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] voxreel_models::AssemblyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for failures that must abort the run before any group is
    /// processed. Everything else is absorbed at the group boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Config(_))
    }
}
