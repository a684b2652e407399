//! Songs, hearings and the rules a song name has to follow.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use thiserror::Error;

/// Longest accepted song name, in bytes.
pub const MAX_NAME_LEN: usize = 100;

/// How a song is stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    /// Never reused; larger ids were added later.
    pub id: i64,
    /// Unique ignoring case. Feel free to include the artist.
    pub name: String,
    /// Local time of the first registration, with its offset.
    pub added_at: DateTime<FixedOffset>,
}

/// One recorded instance of listening to a song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hearing {
    pub id: i64,
    pub song_id: i64,
    pub heard_at: DateTime<FixedOffset>,
}

/// A hearing joined with its song's name; what the rankings read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongHearing {
    pub song_id: i64,
    pub name: String,
    pub heard_at: DateTime<FixedOffset>,
}

impl SongHearing {
    #[must_use]
    pub fn new(song_id: i64, name: impl Into<String>, heard_at: DateTime<FixedOffset>) -> Self {
        Self {
            song_id,
            name: name.into(),
            heard_at,
        }
    }
}

/// Summary of a single song, as shown by `earmark info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongInfo {
    pub song: Song,
    pub hearings: usize,
    pub last_heard: Option<DateTime<FixedOffset>>,
}

/// Why a song name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("the given name is empty")]
    Empty,
    #[error("the given name is too long ({len} bytes, at most {MAX_NAME_LEN} allowed)")]
    TooLong { len: usize },
    #[error("the given name contains a newline character")]
    ContainsNewline,
}

/// Check a name before it is written anywhere.
///
/// Names are taken as they are; trimming is the caller's business.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(NameError::TooLong { len: name.len() });
    }
    if name.contains('\n') {
        return Err(NameError::ContainsNewline);
    }
    Ok(())
}

/// Format a timestamp the way it is persisted: RFC 3339, whole seconds,
/// keeping the local offset (`Z` when the offset is zero).
#[must_use]
pub fn format_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Inverse of [`format_timestamp`]. Fractional seconds are accepted too.
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value)
}
