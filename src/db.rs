//! SQLite storage for songs and hearings.
//!
//! [`Store`] owns the connection and is the only thing that writes to it.
//! Rankings read a snapshot of the hearing log ([`SongHearing`] rows) and
//! never touch the database themselves.
//!
//! The schema is compatible with existing history files: timestamps are
//! RFC 3339 text with the local offset, ids use `AUTOINCREMENT` so the
//! largest id is always the newest row, and song names are unique ignoring
//! case.

use crate::algorithm::{self, Ranked, RankingContext};
use crate::clock::{Clock, LocalClock};
use crate::error::{StoreError, StoreResult};
use crate::listing;
use crate::song::{self, Hearing, Song, SongHearing, SongInfo};
use chrono::{DateTime, Duration, FixedOffset};
use log::{debug, info, trace};
use rusqlite::{ffi, params, Connection, OptionalExtension};
use std::path::Path;

// `id` is spelled out instead of relying on rowid, so that AUTOINCREMENT
// can be set and ids are never reused.
const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS song(
         id      INTEGER PRIMARY KEY AUTOINCREMENT,
         name    TEXT NOT NULL,
         addedAt TEXT NOT NULL,
         CONSTRAINT name_unique UNIQUE(name COLLATE NOCASE)
     )",
    "CREATE INDEX IF NOT EXISTS song_name ON song(name)",
    "CREATE TABLE IF NOT EXISTS hearing(
         id      INTEGER PRIMARY KEY AUTOINCREMENT,
         songID  INTEGER NOT NULL,
         heardAt TEXT NOT NULL,
         FOREIGN KEY(songID) REFERENCES song(id)
     )",
    "CREATE INDEX IF NOT EXISTS hearing_song_id ON hearing(songID)",
];

/// Open the database file at `path`, creating it if needed.
///
/// Foreign keys are switched on for the connection; without them SQLite
/// would happily delete songs that still have hearings.
pub fn connect(path: &Path) -> StoreResult<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    info!("Opened song database at {}", path.display());
    Ok(conn)
}

/// Same as [`connect`], for a throwaway in-memory database.
pub fn connect_in_memory() -> StoreResult<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// What a single write statement did, with the constraint failures the
/// store cares about told apart from everything else.
#[derive(Debug)]
pub enum WriteOutcome {
    /// The statement ran and changed this many rows.
    Written(usize),
    /// A unique constraint fired, i.e. the song name is taken.
    AlreadyExists,
    /// A foreign key constraint fired, i.e. hearings still point at the song.
    StillReferenced,
    Failed(rusqlite::Error),
}

impl WriteOutcome {
    #[must_use]
    pub fn classify(result: rusqlite::Result<usize>) -> Self {
        match result {
            Ok(rows) => Self::Written(rows),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Self::AlreadyExists
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Self::StillReferenced
            }
            Err(err) => Self::Failed(err),
        }
    }

    /// Turn the outcome into the store's error for the song called `name`.
    pub fn into_result(self, name: &str) -> StoreResult<usize> {
        match self {
            Self::Written(rows) => Ok(rows),
            Self::AlreadyExists => Err(StoreError::AlreadyExists(name.to_owned())),
            Self::StillReferenced => Err(StoreError::Integrity(name.to_owned())),
            Self::Failed(err) => Err(StoreError::Storage(err)),
        }
    }
}

fn parse_stored(value: String) -> StoreResult<DateTime<FixedOffset>> {
    song::parse_timestamp(&value).map_err(|source| StoreError::Timestamp { value, source })
}

/// The song catalog and hearing log.
pub struct Store<C: Clock = LocalClock> {
    conn: Connection,
    clock: C,
    ranking: RankingContext,
}

impl Store<LocalClock> {
    /// Connect to `path` and make sure the schema exists.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::new(connect(path)?, LocalClock)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::new(connect_in_memory()?, LocalClock)
    }
}

impl<C: Clock> Store<C> {
    /// Wrap an open connection, creating the schema if it is missing.
    pub fn new(conn: Connection, clock: C) -> StoreResult<Self> {
        let mut store = Self {
            conn,
            clock,
            ranking: RankingContext::default(),
        };
        store.create_schema_if_not_exists()?;
        Ok(store)
    }

    /// Use other decay half-lives for the rankings.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidRanking`] if a half-life is zero, negative or
    /// not finite.
    pub fn with_ranking(mut self, ranking: RankingContext) -> StoreResult<Self> {
        ranking
            .validate()
            .map_err(|err| StoreError::InvalidRanking(format!("{err:#}")))?;
        self.ranking = ranking;
        Ok(self)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn ranking(&self) -> &RankingContext {
        &self.ranking
    }

    /// All statements run in one transaction, so a half-created schema is
    /// never left behind.
    fn create_schema_if_not_exists(&mut self) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        for statement in SCHEMA {
            tx.execute(statement, [])?;
        }
        tx.commit()?;
        debug!("Song database schema is in place.");
        Ok(())
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    fn insert_song(&self, name: &str) -> WriteOutcome {
        let added_at = song::format_timestamp(&self.now());
        WriteOutcome::classify(self.conn.execute(
            "INSERT INTO song(name, addedAt) VALUES (?1, ?2)",
            params![name, added_at],
        ))
    }

    /// Id of the song called `name`, ignoring case.
    fn song_id(&self, name: &str) -> StoreResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM song WHERE name = ?1 COLLATE NOCASE",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn require_song_id(&self, name: &str) -> StoreResult<i64> {
        self.song_id(name)?
            .ok_or_else(|| StoreError::song_not_found(name))
    }

    /// Add a new song, timestamped with the current local time.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] if the name is empty, too long or
    ///   contains a newline
    /// - [`StoreError::AlreadyExists`] if a song with the same name, ignoring
    ///   case, is already catalogued
    pub fn add_song(&mut self, name: &str) -> StoreResult<()> {
        song::validate_name(name)?;
        self.insert_song(name).into_result(name)?;
        debug!("Added song `{name}'.");
        Ok(())
    }

    /// Register that the song called `name` (ignoring case) was just heard.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] for an invalid name
    /// - [`StoreError::NotFound`] if no such song is catalogued
    pub fn add_hearing(&mut self, name: &str) -> StoreResult<()> {
        song::validate_name(name)?;
        let song_id = self.require_song_id(name)?;
        let heard_at = song::format_timestamp(&self.now());

        WriteOutcome::classify(self.conn.execute(
            "INSERT INTO hearing(songID, heardAt) VALUES (?1, ?2)",
            params![song_id, heard_at],
        ))
        .into_result(name)?;
        debug!("Registered hearing of `{name}' at {heard_at}.");
        Ok(())
    }

    /// Register a hearing, adding the song first if it is new.
    ///
    /// An existing song is the only failure of the insert that is tolerated;
    /// anything else aborts before a hearing is written.
    pub fn add_hearing_and_song_if_needed(&mut self, name: &str) -> StoreResult<()> {
        song::validate_name(name)?;
        match self.insert_song(name) {
            WriteOutcome::Written(_) => debug!("Added song `{name}'."),
            WriteOutcome::AlreadyExists => trace!("Song `{name}' is already catalogued."),
            other => {
                other.into_result(name)?;
            }
        }
        self.add_hearing(name)
    }

    /// Remove the latest hearing of any song and return that song's name.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the hearing log is empty.
    pub fn remove_last_hearing(&mut self) -> StoreResult<String> {
        self.delete_last_hearing(None)
            .and_then(|removed| removed.ok_or_else(|| StoreError::NotFound("hearing".to_owned())))
    }

    /// Remove the latest hearing of the song called `name` (ignoring case).
    ///
    /// Returns the song's name as stored.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the song doesn't exist or was never heard.
    pub fn remove_last_hearing_of(&mut self, name: &str) -> StoreResult<String> {
        let song_id = self.require_song_id(name)?;
        self.delete_last_hearing(Some(song_id)).and_then(|removed| {
            removed.ok_or_else(|| StoreError::NotFound(format!("hearing of `{name}'")))
        })
    }

    fn delete_last_hearing(&mut self, song_id: Option<i64>) -> StoreResult<Option<String>> {
        let tx = self.conn.transaction()?;
        let last: Option<(i64, String)> = tx
            .query_row(
                "SELECT hearing.id, song.name FROM hearing
                 INNER JOIN song ON song.id = hearing.songID
                 WHERE ?1 IS NULL OR hearing.songID = ?1
                 ORDER BY hearing.id DESC
                 LIMIT 1",
                [song_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((hearing_id, name)) = last else {
            return Ok(None);
        };
        tx.execute("DELETE FROM hearing WHERE id = ?1", [hearing_id])?;
        tx.commit()?;

        debug!("Removed hearing {hearing_id} of `{name}'.");
        Ok(Some(name))
    }

    /// Remove the song called exactly `name`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no song has exactly this name
    /// - [`StoreError::Integrity`] while hearings of the song exist; they are
    ///   never removed along with it
    pub fn remove_song(&mut self, name: &str) -> StoreResult<String> {
        let removed = WriteOutcome::classify(
            self.conn.execute("DELETE FROM song WHERE name = ?1", [name]),
        )
        .into_result(name)?;

        if removed == 0 {
            return Err(StoreError::song_not_found(name));
        }
        debug!("Removed song `{name}'.");
        Ok(name.to_owned())
    }

    /// Remove the most recently added song and return its name.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the catalog is empty
    /// - [`StoreError::Integrity`] while hearings of the song exist
    pub fn remove_last_added_song(&mut self) -> StoreResult<String> {
        let tx = self.conn.transaction()?;
        let last: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, name FROM song ORDER BY id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (song_id, name) = last.ok_or_else(|| StoreError::NotFound("song".to_owned()))?;
        WriteOutcome::classify(tx.execute("DELETE FROM song WHERE id = ?1", [song_id]))
            .into_result(&name)?;
        tx.commit()?;

        debug!("Removed last added song `{name}'.");
        Ok(name)
    }

    /// Rename the song called exactly `name`. Its hearings keep pointing at
    /// it, since only the name column changes.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] if `new_name` is invalid
    /// - [`StoreError::NotFound`] if no song has exactly the name `name`
    /// - [`StoreError::AlreadyExists`] if another song is already called
    ///   `new_name`, ignoring case
    pub fn rename_song(&mut self, name: &str, new_name: &str) -> StoreResult<()> {
        song::validate_name(new_name)?;
        let renamed = WriteOutcome::classify(self.conn.execute(
            "UPDATE song SET name = ?1 WHERE name = ?2",
            params![new_name, name],
        ))
        .into_result(new_name)?;

        if renamed == 0 {
            return Err(StoreError::song_not_found(name));
        }
        debug!("Renamed song `{name}' to `{new_name}'.");
        Ok(())
    }

    /// The song called `name`, ignoring case.
    pub fn find_song(&self, name: &str) -> StoreResult<Song> {
        let row: Option<(i64, String, String)> = self
            .conn
            .query_row(
                "SELECT id, name, addedAt FROM song WHERE name = ?1 COLLATE NOCASE",
                [name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let (id, name, added_at) = row.ok_or_else(|| StoreError::song_not_found(name))?;
        Ok(Song {
            id,
            name,
            added_at: parse_stored(added_at)?,
        })
    }

    /// Every song, newest addition first.
    pub fn songs_in_order_of_addition(&self) -> StoreResult<Vec<Song>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, addedAt FROM song ORDER BY id DESC")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut songs = Vec::new();
        for row in rows {
            let (id, name, added_at) = row?;
            songs.push(Song {
                id,
                name,
                added_at: parse_stored(added_at)?,
            });
        }
        Ok(songs)
    }

    /// Hearings of the song called `name` (ignoring case), oldest first.
    pub fn hearings_of(&self, name: &str) -> StoreResult<Vec<Hearing>> {
        let song_id = self.require_song_id(name)?;
        let mut stmt = self
            .conn
            .prepare("SELECT id, heardAt FROM hearing WHERE songID = ?1 ORDER BY id")?;
        let rows = stmt.query_map([song_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut hearings = Vec::new();
        for row in rows {
            let (id, heard_at) = row?;
            hearings.push(Hearing {
                id,
                song_id,
                heard_at: parse_stored(heard_at)?,
            });
        }
        Ok(hearings)
    }

    /// The whole hearing log joined with song names, in insertion order.
    pub fn song_hearings(&self) -> StoreResult<Vec<SongHearing>> {
        let mut stmt = self.conn.prepare(
            "SELECT hearing.songID, song.name, hearing.heardAt FROM hearing
             INNER JOIN song ON song.id = hearing.songID
             ORDER BY hearing.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut hearings = Vec::new();
        for row in rows {
            let (song_id, name, heard_at) = row?;
            hearings.push(SongHearing {
                song_id,
                name,
                heard_at: parse_stored(heard_at)?,
            });
        }
        trace!("Loaded {} hearings.", hearings.len());
        Ok(hearings)
    }

    fn qualifying_hearings(&self, omit: Option<Duration>) -> StoreResult<Vec<SongHearing>> {
        Ok(listing::apply_omit_window(
            self.song_hearings()?,
            self.now(),
            omit,
        ))
    }

    /// Name, hearing count and last hearing of one song.
    pub fn song_info(&self, name: &str) -> StoreResult<SongInfo> {
        let song = self.find_song(name)?;
        let hearings = self.hearings_of(&song.name)?;
        let last_heard = hearings.iter().map(|hearing| hearing.heard_at).max();

        Ok(SongInfo {
            song,
            hearings: hearings.len(),
            last_heard,
        })
    }

    /// All songs, newest addition first.
    pub fn list_songs_in_order_of_addition(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM song ORDER BY id DESC")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Songs that were heard at least once, most recently heard first.
    pub fn list_songs_in_order_of_last_hearing(&self) -> StoreResult<Vec<String>> {
        Ok(names(listing::last_heard(&self.song_hearings()?)))
    }

    /// Songs by number of hearings outside the omit window.
    pub fn rank_favourite_songs(
        &self,
        omit: Option<Duration>,
    ) -> StoreResult<Vec<Ranked<usize>>> {
        Ok(listing::favourite(&self.qualifying_hearings(omit)?))
    }

    pub fn list_favourite_songs(&self, omit: Option<Duration>) -> StoreResult<Vec<String>> {
        self.rank_favourite_songs(omit).map(names)
    }

    /// Songs by frecency, computed over hearings outside the omit window.
    pub fn rank_frecent_songs(&self, omit: Option<Duration>) -> StoreResult<Vec<Ranked<f64>>> {
        let hearings = self.qualifying_hearings(omit)?;
        Ok(algorithm::frecency(&hearings, self.now(), &self.ranking))
    }

    pub fn list_frecent_songs(&self, omit: Option<Duration>) -> StoreResult<Vec<String>> {
        self.rank_frecent_songs(omit).map(names)
    }

    /// Songs usually heard close to `name`, best suggestion first.
    ///
    /// Fails with [`StoreError::NotFound`] if the song does not exist or has
    /// no hearing outside the omit window.
    pub fn rank_suggestions(
        &self,
        name: &str,
        omit: Option<Duration>,
    ) -> StoreResult<Vec<Ranked<f64>>> {
        let reference = self.require_song_id(name)?;
        let hearings = self.qualifying_hearings(omit)?;

        algorithm::suggestions(&hearings, reference, &self.ranking)
            .ok_or_else(|| StoreError::NotFound(format!("hearing of `{name}'")))
    }

    pub fn list_suggestions(
        &self,
        name: &str,
        omit: Option<Duration>,
    ) -> StoreResult<Vec<String>> {
        self.rank_suggestions(name, omit).map(names)
    }
}

fn names<S>(ranked: Vec<Ranked<S>>) -> Vec<String> {
    ranked.into_iter().map(|entry| entry.name).collect()
}
