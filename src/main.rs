//! # earmark
//!
//! Keeps a history of the songs you hear and ranks them: by how often they
//! were heard, by frecency, and by how close in time they are usually heard
//! to a given song.
//!
//! ## Usage
//!
//! ```bash
//! # Register a hearing, adding the song if it is new
//! earmark register "Daft Punk - Veridis Quo"
//!
//! # Songs by last hearing, by addition, by frecency
//! earmark
//! earmark added
//! earmark frecent --omit 30m
//!
//! # What to hear next
//! earmark suggestions "Daft Punk - Veridis Quo" -v
//! ```
//!
//! Every failing command exits with its own status code, so scripts can tell
//! what went wrong without parsing stderr.

use anyhow::Context;
use clap::{CommandFactory, Parser};
use earmark::algorithm::Ranked;
use earmark::cli::{self, Command, RankingArgs};
use earmark::clock::LocalClock;
use earmark::completion;
use earmark::config::RuntimeConfig;
use earmark::db::{self, Store};
use earmark::song;
use log::debug;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

mod exit {
    pub const CONFIG: u8 = 1;
    pub const OPEN_DB: u8 = 3;
    pub const SCHEMA: u8 = 4;
    pub const REGISTER_NO_ADD: u8 = 5;
    pub const REGISTER: u8 = 6;
    pub const ADDED: u8 = 7;
    pub const FAVOURITE: u8 = 8;
    pub const FRECENT: u8 = 9;
    pub const SUGGESTIONS: u8 = 10;
    pub const REMOVE_HEARING: u8 = 11;
    pub const REMOVE_SONG: u8 = 12;
    pub const RENAME: u8 = 13;
    pub const LAST_HEARD: u8 = 14;
    pub const INFO: u8 = 15;
    pub const COMPLETION: u8 = 16;
}

/// An error together with the status the process should exit with.
struct Failure {
    code: u8,
    error: anyhow::Error,
}

trait ExitCodeExt<T> {
    fn exit_code(self, code: u8) -> Result<T, Failure>;
}

impl<T, E: Into<anyhow::Error>> ExitCodeExt<T> for Result<T, E> {
    fn exit_code(self, code: u8) -> Result<T, Failure> {
        self.map_err(|error| Failure {
            code,
            error: error.into(),
        })
    }
}

/// Main entry point.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug earmark register X` - Show every write
/// - `RUST_LOG=earmark::algorithm=trace earmark frecent` - Ranking details
fn main() -> ExitCode {
    env_logger::init();

    // Clap exits with status 2 on usage errors, including invalid names.
    let args = cli::Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("earmark: {:#}", failure.error);
            ExitCode::from(failure.code)
        }
    }
}

fn load_config(db: Option<PathBuf>) -> Result<RuntimeConfig, Failure> {
    let config = RuntimeConfig::load()
        .context("Failed to load configuration")
        .exit_code(exit::CONFIG)?;
    Ok(match db {
        Some(path) => config.with_db_path(path),
        None => config,
    })
}

fn open_store(db: Option<PathBuf>) -> Result<Store, Failure> {
    let config = load_config(db)?;
    let db_path = config.db_path().exit_code(exit::CONFIG)?;

    let conn = db::connect(&db_path)
        .with_context(|| format!("Failed to open song database {}", db_path.display()))
        .exit_code(exit::OPEN_DB)?;
    let store = Store::new(conn, LocalClock)
        .context("Failed to set up the song database schema")
        .exit_code(exit::SCHEMA)?;

    store
        .with_ranking(config.ranking)
        .context("Failed to apply ranking settings")
        .exit_code(exit::CONFIG)
}

fn print_names(out: &mut impl Write, names: &[String]) -> io::Result<()> {
    for name in names {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

/// Print a ranked listing, with scores in front when `verbose`.
fn print_ranked<S>(
    out: &mut impl Write,
    ranked: &[Ranked<S>],
    verbose: bool,
    score: impl Fn(&S) -> String,
) -> io::Result<()> {
    for entry in ranked {
        if verbose {
            writeln!(out, "{:>10}  {}", score(&entry.score), entry.name)?;
        } else {
            writeln!(out, "{}", entry.name)?;
        }
    }
    Ok(())
}

fn decimal(score: &f64) -> String {
    format!("{score:.4}")
}

fn run(args: cli::Args) -> Result<(), Failure> {
    let mut stdout = io::stdout().lock();

    match args.command {
        None => {
            let store = open_store(args.db)?;
            let names = store
                .list_songs_in_order_of_last_hearing()
                .context("Failed to list songs by last hearing")
                .exit_code(exit::LAST_HEARD)?;
            print_names(&mut stdout, &names).exit_code(exit::LAST_HEARD)?;
        }
        Some(Command::Register { no_add, name }) => {
            let mut store = open_store(args.db)?;
            if no_add {
                store
                    .add_hearing(&name)
                    .with_context(|| format!("Failed to register hearing of `{name}'"))
                    .exit_code(exit::REGISTER_NO_ADD)?;
            } else {
                store
                    .add_hearing_and_song_if_needed(&name)
                    .with_context(|| format!("Failed to register hearing of `{name}'"))
                    .exit_code(exit::REGISTER)?;
            }
        }
        Some(Command::Added) => {
            let store = open_store(args.db)?;
            let names = store
                .list_songs_in_order_of_addition()
                .context("Failed to list songs by addition")
                .exit_code(exit::ADDED)?;
            print_names(&mut stdout, &names).exit_code(exit::ADDED)?;
        }
        Some(Command::Favourite { ranking: RankingArgs { omit, verbose } }) => {
            let store = open_store(args.db)?;
            let ranked = store
                .rank_favourite_songs(omit)
                .context("Failed to list favourite songs")
                .exit_code(exit::FAVOURITE)?;
            print_ranked(&mut stdout, &ranked, verbose, usize::to_string)
                .exit_code(exit::FAVOURITE)?;
        }
        Some(Command::Frecent { ranking: RankingArgs { omit, verbose } }) => {
            let store = open_store(args.db)?;
            let ranked = store
                .rank_frecent_songs(omit)
                .context("Failed to list frecent songs")
                .exit_code(exit::FRECENT)?;
            print_ranked(&mut stdout, &ranked, verbose, decimal).exit_code(exit::FRECENT)?;
        }
        Some(Command::Suggestions { name, ranking: RankingArgs { omit, verbose } }) => {
            let store = open_store(args.db)?;
            let ranked = store
                .rank_suggestions(&name, omit)
                .with_context(|| format!("Failed to list suggestions for `{name}'"))
                .exit_code(exit::SUGGESTIONS)?;
            print_ranked(&mut stdout, &ranked, verbose, decimal)
                .exit_code(exit::SUGGESTIONS)?;
        }
        Some(Command::RemoveHearing { name }) => {
            let mut store = open_store(args.db)?;
            let removed = match &name {
                Some(name) => store.remove_last_hearing_of(name),
                None => store.remove_last_hearing(),
            }
            .context("Failed to remove hearing")
            .exit_code(exit::REMOVE_HEARING)?;
            eprintln!("Removed latest hearing of: {removed}");
        }
        Some(Command::RemoveSong { name }) => {
            let mut store = open_store(args.db)?;
            let removed = match &name {
                Some(name) => store.remove_song(name),
                None => store.remove_last_added_song(),
            }
            .context("Failed to remove song")
            .exit_code(exit::REMOVE_SONG)?;
            eprintln!("Removed song: {removed}");
        }
        Some(Command::Rename { name, new_name }) => {
            let mut store = open_store(args.db)?;
            store
                .rename_song(&name, &new_name)
                .with_context(|| format!("Failed to rename `{name}'"))
                .exit_code(exit::RENAME)?;
            eprintln!("Renamed song: {name} -> {new_name}");
        }
        Some(Command::Info { name }) => {
            let store = open_store(args.db)?;
            let info = store
                .song_info(&name)
                .with_context(|| format!("Failed to look up `{name}'"))
                .exit_code(exit::INFO)?;

            let last_heard = info
                .last_heard
                .as_ref()
                .map_or_else(|| "never".to_owned(), song::format_timestamp);
            writeln!(
                stdout,
                "Name:       {}\nAdded:      {}\nHearings:   {}\nLast heard: {}",
                info.song.name,
                song::format_timestamp(&info.song.added_at),
                info.hearings,
                last_heard
            )
            .exit_code(exit::INFO)?;
        }
        Some(Command::Completion { shell }) => {
            debug!("Generating {shell:?} completions");
            completion::generate_completions(
                completion::shell_to_completion_shell(&shell),
                &mut cli::Args::command(),
                &mut stdout,
            );
            stdout.flush().exit_code(exit::COMPLETION)?;
        }
        Some(Command::CompleteSongs) => {
            let db_path = load_config(args.db)?
                .db_path()
                .exit_code(exit::CONFIG)?;
            completion::print_song_completions(&db_path, &mut stdout)
                .exit_code(exit::COMPLETION)?;
        }
    }

    Ok(())
}
