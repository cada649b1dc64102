//! Lookout configuration.
//!
//! Loaded from `~/.lookout/config.toml`. A missing file means defaults.
//!
//! ```toml
//! state-path = "/var/lib/lookout/state.sqlite"
//! log-level = "info"
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::storage::Storage;

/// Lookout configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Where conversation state is stored.
    /// Defaults to `~/.lookout/state.sqlite`.
    pub state_path: Option<PathBuf>,

    /// Log filter used when `LOOKOUT_LOG` is unset (e.g. `"info"`, `"lookout=debug"`).
    pub log_level: Option<String>,
}

impl Config {
    /// Load config from `~/.lookout/config.toml`.
    /// Returns defaults if the file doesn't exist, an error if it is invalid.
    pub fn load() -> Result<Self, String> {
        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };

        let contents = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        Self::parse(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// The config file path: `~/.lookout/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".lookout").join("config.toml"))
    }

    /// The database path: configured, or the storage default.
    pub fn state_path(&self) -> Option<PathBuf> {
        self.state_path.clone().or_else(Storage::default_path)
    }
}
