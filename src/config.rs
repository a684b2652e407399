//! # Configuration Module
//!
//! Where earmark keeps its files and how the rankings are tuned.
//!
//! ## Data Storage
//!
//! The song database lives in the platform-standard data directory:
//! - Linux: `~/.local/share/earmark/earmark.db`
//! - macOS: `~/Library/Application Support/earmark/earmark.db`
//! - Windows: `%APPDATA%\earmark\earmark.db`
//!
//! ## Config File
//!
//! An optional JSON file in the config directory
//! (`~/.config/earmark/config.json` on Linux) can override the database
//! location and the ranking half-lives. Every field is optional:
//!
//! ```json
//! {
//!     "db_path": "/home/me/music/hearings.db",
//!     "ranking": {
//!         "frecency_half_life_hours": 720.0,
//!         "suggestion_half_life_minutes": 60.0
//!     }
//! }
//! ```

use crate::algorithm::RankingContext;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "earmark";
const DB_FILE: &str = "earmark.db";
const CONFIG_FILE: &str = "config.json";

/// Returns the platform-appropriate data directory for earmark, creating it
/// if it doesn't exist.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The earmark subdirectory cannot be created due to permissions
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    ensure_app_dir(&data_dir)
}

/// Create the earmark directory under `base` and return its path.
fn ensure_app_dir(base: &Path) -> Result<PathBuf> {
    let earmark_dir = base.join(APP_DIR);
    fs::create_dir_all(&earmark_dir).with_context(|| {
        format!(
            "Failed to create earmark data directory at {}. Please check file permissions.",
            earmark_dir.display()
        )
    })?;

    Ok(earmark_dir)
}

/// Returns the default database file path.
///
/// # Examples
///
/// ```no_run
/// use earmark::config::get_db_path;
///
/// let db_path = get_db_path()?;
/// println!("Database location: {}", db_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE))
}

/// Returns the path of the optional config file. Nothing is created.
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        anyhow::anyhow!("Could not determine system config directory.")
    })?;
    Ok(config_dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Database file; the platform default when unset.
    pub db_path: Option<PathBuf>,
    pub ranking: RankingContext,
}

impl RuntimeConfig {
    /// Read the config file if there is one, otherwise use the defaults.
    pub fn load() -> Result<Self> {
        let path = get_config_path()?;
        if !path.exists() {
            log::debug!("No config file at {}, using defaults.", path.display());
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Read and validate the config file at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .ranking
            .validate()
            .with_context(|| format!("Invalid ranking settings in {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Override the database location, e.g. from `--db`.
    #[must_use]
    pub fn with_db_path(mut self, db_path: PathBuf) -> Self {
        self.db_path = Some(db_path);
        self
    }

    /// The database to open: the configured path, or the platform default.
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => get_db_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_app_dir_is_created_under_base() {
        let base = TempDir::new().unwrap();
        let dir = ensure_app_dir(base.path()).unwrap();

        assert_eq!(dir, base.path().join(APP_DIR));
        assert!(dir.is_dir());

        // Creating it again is fine.
        assert_eq!(ensure_app_dir(base.path()).unwrap(), dir);
    }

    #[test]
    fn test_config_path_structure() {
        let path = get_config_path().expect("Should get valid path");
        assert!(path.ends_with("earmark/config.json"));
    }

    #[test]
    fn test_from_file_fills_missing_fields() {
        let (_dir, path) = write_config(r#"{ "ranking": { "suggestion_half_life_minutes": 30 } }"#);
        let config = RuntimeConfig::from_file(&path).unwrap();

        assert_eq!(config.db_path, None);
        assert_eq!(config.ranking.suggestion_half_life_minutes, 30.0);
        assert_eq!(
            config.ranking.frecency_half_life_hours,
            RankingContext::default().frecency_half_life_hours
        );
    }

    #[test]
    fn test_from_file_reads_db_path() {
        let (_dir, path) = write_config(r#"{ "db_path": "/tmp/hearings.db" }"#);
        let config = RuntimeConfig::from_file(&path).unwrap();

        assert_eq!(config.db_path().unwrap(), PathBuf::from("/tmp/hearings.db"));
    }

    #[test]
    fn test_from_file_rejects_bad_half_life() {
        let (_dir, path) = write_config(r#"{ "ranking": { "frecency_half_life_hours": 0 } }"#);
        assert!(RuntimeConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_from_file_rejects_invalid_json() {
        let (_dir, path) = write_config("db_path = 3");
        assert!(RuntimeConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_with_db_path_overrides_config() {
        let (_dir, path) = write_config(r#"{ "db_path": "/tmp/hearings.db" }"#);
        let config = RuntimeConfig::from_file(&path)
            .unwrap()
            .with_db_path(PathBuf::from("other.db"));

        assert_eq!(config.db_path().unwrap(), PathBuf::from("other.db"));
    }
}
