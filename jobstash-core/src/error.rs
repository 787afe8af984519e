//! Error types and result aliases.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Abort(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Builds a transport error from anything displayable.
    pub fn transport(message: impl std::fmt::Display) -> Self {
        Error::Transport(message.to_string())
    }

    /// Builds an abort error carrying a user-facing message.
    ///
    /// Aborts halt the surrounding build step; the message must name the
    /// failed transfer and embed the underlying cause.
    pub fn abort(message: impl std::fmt::Display) -> Self {
        Error::Abort(message.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
