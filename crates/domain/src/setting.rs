// crates/domain/src/setting.rs

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingError {
    #[error("failed reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Directories to index and basename globs to skip.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileSettings {
    pub include: Vec<PathBuf>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedSettings {
    pub urls: Vec<String>,
}

/// Settings file contents. Every field is optional; a missing file is
/// the same as an empty one.
///
/// `sqlite_url` accepts either a plain filesystem path or a
/// `sqlite://`-prefixed URL; the store normalises on open.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub sqlite_url: String,
    pub files: FileSettings,
    pub feeds: FeedSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sqlite_url: default_db_path().to_string_lossy().into_owned(),
            files: FileSettings::default(),
            feeds: FeedSettings::default(),
        }
    }
}

/// Application data directory: `$XDG_CONFIG_HOME/glean`, falling back to
/// `$HOME/.config/glean`, falling back to the current directory.
pub fn app_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("glean");
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".config").join("glean");
    }
    PathBuf::from(".")
}

pub fn default_config_path() -> PathBuf {
    app_dir().join("config.toml")
}

fn default_db_path() -> PathBuf {
    app_dir().join("db.sqlite3")
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults; an
    /// unreadable or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self, SettingError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| SettingError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&text).map_err(|source| SettingError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
