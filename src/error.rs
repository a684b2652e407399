//! Errors surfaced by the store.
//!
//! Store operations return [`StoreError`] so callers can tell a missing song
//! from a duplicate or a blocked deletion. The CLI wraps these in
//! `anyhow::Error` with context, the way the rest of the binary reports
//! failures.

use crate::song::NameError;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A name failed validation; nothing was written.
    #[error(transparent)]
    Validation(#[from] NameError),

    /// A song with this name (ignoring case) is already catalogued.
    #[error("song `{0}' already exists")]
    AlreadyExists(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Hearings still reference the song. There is no cascading delete.
    #[error("song `{0}' still has hearings; remove them first")]
    Integrity(String),

    /// Ranking half-lives that are not positive finite numbers.
    #[error("invalid ranking settings: {0}")]
    InvalidRanking(String),

    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("invalid timestamp `{value}' in database: {source}")]
    Timestamp {
        value: String,
        source: chrono::ParseError,
    },
}

impl StoreError {
    pub(crate) fn song_not_found(name: &str) -> Self {
        Self::NotFound(format!("song `{name}'"))
    }
}
