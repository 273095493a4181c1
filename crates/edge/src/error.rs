use domain::doc::UnknownKind;
use domain::setting::SettingError;
use extract::ExtractError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] SettingError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Malformed MATCH expression. Surfaces to the caller; the store is
    /// untouched.
    #[error("query error: {0}")]
    Query(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("invalid exclude pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error(transparent)]
    UnknownKind(#[from] UnknownKind),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
