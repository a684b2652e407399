//! # Shell Completion Module
//!
//! Completion scripts come from clap_complete. Song names are completed
//! dynamically through the hidden `complete-songs` command, which prints one
//! name per line.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! earmark completion bash > ~/.local/share/bash-completion/completions/earmark
//!
//! # Generate zsh completions
//! earmark completion zsh > ~/.config/zsh/completions/_earmark
//! ```

use crate::cli;
use crate::db::Store;
use anyhow::{Context, Result};
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::Write;
use std::path::Path;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: &cli::Shell) -> CompletionShell {
    match shell {
        cli::Shell::Bash => CompletionShell::Bash,
        cli::Shell::Zsh => CompletionShell::Zsh,
        cli::Shell::Fish => CompletionShell::Fish,
        cli::Shell::PowerShell => CompletionShell::PowerShell,
        cli::Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Song names in the database at `db_path`, sorted alphabetically.
///
/// A database that doesn't exist yet has no songs; it is not created just to
/// answer a completion request.
pub fn get_song_completions(db_path: &Path) -> Result<Vec<String>> {
    if !db_path.exists() {
        return Ok(Vec::new());
    }

    let store = Store::open(db_path)
        .with_context(|| format!("Failed to open song database {}", db_path.display()))?;
    let mut names = store.list_songs_in_order_of_addition()?;
    names.sort();
    Ok(names)
}

/// Quote a name for the shell if it contains whitespace.
pub fn quote_completion(name: &str) -> String {
    if name.contains(char::is_whitespace) {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        name.to_owned()
    }
}

/// Print one completion candidate per line.
pub fn print_song_completions(db_path: &Path, out: &mut dyn Write) -> Result<()> {
    for name in get_song_completions(db_path)? {
        writeln!(out, "{}", quote_completion(&name))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_shell_conversion() {
        assert_eq!(shell_to_completion_shell(&cli::Shell::Bash), CompletionShell::Bash);
        assert_eq!(shell_to_completion_shell(&cli::Shell::Zsh), CompletionShell::Zsh);
        assert_eq!(
            shell_to_completion_shell(&cli::Shell::PowerShell),
            CompletionShell::PowerShell
        );
    }

    #[test]
    fn test_generate_bash_completions() {
        let mut out = Vec::new();
        generate_completions(CompletionShell::Bash, &mut cli::Args::command(), &mut out);

        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("earmark"));
        assert!(script.contains("suggestions"));
    }

    #[test]
    fn test_quote_completion() {
        assert_eq!(quote_completion("Intro"), "Intro");
        assert_eq!(quote_completion("Daft Punk - Aerodynamic"), "\"Daft Punk - Aerodynamic\"");
        assert_eq!(quote_completion("Say \"hi\" now"), "\"Say \\\"hi\\\" now\"");
    }

    #[test]
    fn test_missing_database_completes_nothing() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("missing.db");

        assert!(get_song_completions(&db_path).unwrap().is_empty());
        assert!(!db_path.exists());
    }

    #[test]
    fn test_print_song_completions() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("songs.db");
        {
            let mut store = Store::open(&db_path).unwrap();
            store.add_song("b side").unwrap();
            store.add_song("Anthem").unwrap();
        }

        let mut out = Vec::new();
        print_song_completions(&db_path, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Anthem\n\"b side\"\n");
    }
}
