//! Song hearing history with frecency and suggestion rankings.
//!
//! Core modules:
//! - [`db`] - The SQLite store of songs and hearings
//! - [`algorithm`] - Frecency and suggestion scoring
//! - [`listing`] - Plain orderings and the omit window
//! - [`song`] - Domain types and name validation
//!
//! ### Supporting Modules
//!
//! - [`clock`] - Injectable time source
//! - [`error`] - Store errors
//! - [`config`] - Data directory and config file
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use earmark::db::Store;
//! use chrono::Duration;
//!
//! let mut store = Store::open(&earmark::config::get_db_path()?)?;
//! store.add_hearing_and_song_if_needed("Daft Punk - Veridis Quo")?;
//!
//! for song in store.list_frecent_songs(Some(Duration::minutes(30)))? {
//!     println!("{song}");
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Rankings
//!
//! Every hearing counts toward a song's frecency with a weight that halves
//! every 30 days. Suggestions for a song R look at each hearing of another
//! song and how far it is from the nearest hearing of R; the weight halves
//! every 60 minutes of distance. Both half-lives can be tuned in the config
//! file.
//!
//! An omit window drops the most recent hearings before ranking, so the song
//! playing right now does not suggest itself.

pub mod algorithm;
pub mod cli;
pub mod clock;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod listing;
pub mod song;
