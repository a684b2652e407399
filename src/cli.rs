//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for earmark using Clap
//! derive macros.
//!
//! ## Commands
//!
//! - *(none)*: List songs, most recently heard first
//! - `register`: Record that a song was just heard
//! - `added`: List songs, most recently added first
//! - `favourite`, `frecent`: Rank songs by hearings or by frecency
//! - `suggestions`: Songs usually heard close to a given song
//! - `remove-hearing`, `remove-song`, `rename`: Fix up the history
//! - `info`: Details of a single song
//!
//! ## Examples
//!
//! ```bash
//! earmark register "Daft Punk - Veridis Quo"
//! earmark frecent --omit 30m -v
//! earmark suggestions "Daft Punk - Veridis Quo"
//! ```

use crate::song;
use chrono::Duration;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// Without a subcommand, earmark lists the songs in order of their last
/// hearing.
#[derive(Parser, Debug)]
#[command(name = "earmark")]
#[command(about = "earmark: remember what you listen to and what to hear next")]
#[command(version)]
pub struct Args {
    /// Song database to use instead of the default location
    #[arg(
        long,
        global = true,
        env = "EARMARK_DB",
        value_name = "FILE",
        value_hint = clap::ValueHint::FilePath
    )]
    pub db: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Options shared by every ranked listing.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RankingArgs {
    /// Ignore hearings younger than this, e.g. `30m`, `2h` or `1h30m`
    ///
    /// Keeps the song that is playing right now from dominating the list.
    #[arg(long, value_name = "DURATION", value_parser = parse_omit, allow_hyphen_values = true)]
    pub omit: Option<Duration>,

    /// Print the score next to each song
    #[arg(short, long)]
    pub verbose: bool,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register a hearing of a song
    ///
    /// The song is added to the catalog first if it is new. Names are
    /// matched ignoring case.
    Register {
        /// Only register hearings of songs that are already catalogued
        #[arg(long)]
        no_add: bool,

        /// Song name; feel free to include the artist
        #[arg(value_parser = parse_song_name, value_hint = clap::ValueHint::Other)]
        name: String,
    },

    /// List all songs, most recently added first
    Added,

    /// List songs by number of hearings, most heard first
    Favourite {
        #[command(flatten)]
        ranking: RankingArgs,
    },

    /// List songs by frecency: often and recently heard songs first
    Frecent {
        #[command(flatten)]
        ranking: RankingArgs,
    },

    /// List songs that are usually heard close to the given song
    Suggestions {
        /// Song to find companions for
        #[arg(value_parser = parse_song_name, value_hint = clap::ValueHint::Other)]
        name: String,

        #[command(flatten)]
        ranking: RankingArgs,
    },

    /// Remove the latest hearing, of any song or of the given one
    RemoveHearing {
        #[arg(value_parser = parse_song_name, value_hint = clap::ValueHint::Other)]
        name: Option<String>,
    },

    /// Remove a song without hearings, or the last added song
    ///
    /// The name has to match exactly, including case.
    RemoveSong {
        #[arg(value_parser = parse_song_name, value_hint = clap::ValueHint::Other)]
        name: Option<String>,
    },

    /// Rename a song, keeping its hearings
    Rename {
        /// Current name, matched exactly
        #[arg(value_parser = parse_song_name, value_hint = clap::ValueHint::Other)]
        name: String,

        #[arg(value_parser = parse_song_name)]
        new_name: String,
    },

    /// Show when a song was added, how often and when it was last heard
    Info {
        #[arg(value_parser = parse_song_name, value_hint = clap::ValueHint::Other)]
        name: String,
    },

    /// Generate shell completions
    ///
    /// Usage: earmark completion bash > ~/.local/share/bash-completion/completions/earmark
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// List song names for completion (hidden command)
    #[command(hide = true)]
    CompleteSongs,
}

/// Trim a song name given on the command line and check it.
pub fn parse_song_name(value: &str) -> Result<String, String> {
    let name = value.trim();
    song::validate_name(name).map_err(|err| err.to_string())?;
    Ok(name.to_owned())
}

/// Parse a duration literal such as `90s`, `1.5h` or `1h30m`.
///
/// A literal is a sequence of decimal numbers, each followed by one of the
/// units `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`, with an optional
/// leading sign. A bare `0` needs no unit.
pub fn parse_omit(value: &str) -> Result<Duration, String> {
    let invalid = || format!("invalid duration `{value}'");

    let (negative, unsigned) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    if unsigned == "0" {
        return Ok(Duration::zero());
    }
    if unsigned.is_empty() {
        return Err(invalid());
    }

    let is_number_char = |c: char| c.is_ascii_digit() || c == '.';
    let mut rest = unsigned;
    let mut nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest.find(|c: char| !is_number_char(c)).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let number: f64 = number.parse().map_err(|_| invalid())?;

        let unit_len = tail.find(is_number_char).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in duration `{value}'")),
            other => return Err(format!("unknown unit `{other}' in duration `{value}'")),
        };

        nanos += number * scale;
        rest = tail;
    }

    if negative {
        nanos = -nanos;
    }
    if !nanos.is_finite() || nanos.abs() >= i64::MAX as f64 {
        return Err(format!("duration `{value}' is out of range"));
    }
    Ok(Duration::nanoseconds(nanos.round() as i64))
}
