//! Local persistence for conversation state.
//!
//! Three independent keys live in one `SQLite` key/value table:
//!
//! ```text
//! <state.sqlite>
//!   aim-tool-calls       # invocation table, in recording order
//!   aim-monitoring-task  # the monitoring task
//!   aim-messages         # conversation transcript
//! ```
//!
//! Values are JSON text with no schema version. A value that no longer
//! parses is discarded and its default used in its place.

mod invocations;
mod task;
mod transcript;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use rusqlite::{Connection, OptionalExtension};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{info, warn};

use crate::model::{MonitoringTask, ToolInvocation};

pub const TOOL_CALLS_KEY: &str = "aim-tool-calls";
pub const TASK_KEY: &str = "aim-monitoring-task";
pub const MESSAGES_KEY: &str = "aim-messages";

const ALL_KEYS: [&str; 3] = [TOOL_CALLS_KEY, TASK_KEY, MESSAGES_KEY];

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Durable local storage for one conversation.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens (or creates) the database at `path`.
    ///
    /// Parent directories are created if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )?;
        Ok(Self { conn })
    }

    /// Returns the default database path: `~/.lookout/state.sqlite`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".lookout").join("state.sqlite"))
    }

    /// Whether a value is stored under `key`.
    #[cfg(test)]
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.read(key)?.is_some())
    }

    /// Erases all three keys in one transaction.
    pub fn reset(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for key in ALL_KEYS {
            tx.execute("DELETE FROM state WHERE key = ?1", [key])?;
        }
        tx.commit()?;
        info!("stored conversation state erased");
        Ok(())
    }

    /// Saves the invocation table and, when given, the task, in one
    /// transaction. Either both land or neither does.
    pub fn save_reconciled(
        &self,
        invocations: &[ToolInvocation],
        task: Option<&MonitoringTask>,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.save_invocations(invocations)?;
        if let Some(task) = task {
            self.save_task(task)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Makes every write of `key` fail until [`Storage::unblock_writes`].
    #[cfg(test)]
    pub(crate) fn block_writes(&self, key: &str) {
        let key = key.replace('\'', "''");
        self.conn
            .execute_batch(&format!(
                "CREATE TRIGGER block_insert BEFORE INSERT ON state WHEN NEW.key = '{key}'
                 BEGIN SELECT RAISE(ABORT, 'write blocked'); END;
                 CREATE TRIGGER block_update BEFORE UPDATE ON state WHEN NEW.key = '{key}'
                 BEGIN SELECT RAISE(ABORT, 'write blocked'); END;"
            ))
            .unwrap();
    }

    #[cfg(test)]
    pub(crate) fn unblock_writes(&self) {
        self.conn
            .execute_batch("DROP TRIGGER block_insert; DROP TRIGGER block_update;")
            .unwrap();
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM state WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn write_raw(&self, key: &str, json: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, json],
        )?;
        Ok(())
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.write_raw(key, &json)
    }

    /// Reads `key`, falling back to the default when it is absent or
    /// no longer parses.
    fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let Some(json) = self.read(key)? else {
            return Ok(T::default());
        };
        match serde_json::from_str(&json) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(key, error = %e, "discarding malformed stored value");
                Ok(T::default())
            }
        }
    }
}
