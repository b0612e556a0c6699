use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Why a feed could not produce a snapshot this cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response body: {0}")]
    Parse(String),

    #[error("feed returned no articles")]
    Empty,
}

impl FetchError {
    /// Short classification used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::HttpStatus(_) => "http_status",
            FetchError::Transport(_) => "transport",
            FetchError::Parse(_) => "parse",
            FetchError::Empty => "empty",
        }
    }

    /// Wording shown to command callers; carries no response or socket detail.
    pub fn summary(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timed out",
            FetchError::HttpStatus(_) => "server returned an error",
            FetchError::Transport(_) => "could not reach the server",
            FetchError::Parse(_) => "unexpected response",
            FetchError::Empty => "no articles yet",
        }
    }
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("state file is corrupt: {0}")]
    CorruptSchema(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("delivery to {destination} failed: {reason}")]
    Failed { destination: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("caller {0} is not authorized for this command")]
    Unauthorized(String),
}

#[derive(Error, Debug)]
pub enum McUpdateError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Unknown feed: {0}")]
    UnknownFeed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, McUpdateError>;
