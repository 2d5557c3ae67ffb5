//! Append-only command log storage

use shared::{CommandLog, NewCommandLog};
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug)]
pub enum StorageError {
    /// The store's lock was poisoned by a panicking writer
    Poisoned,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Poisoned => write!(f, "command log store lock poisoned"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Storage backend for command logs
///
/// Entries are never updated or deleted once written.
pub trait LogStorage: Send + Sync {
    fn log_command(&self, entry: NewCommandLog) -> Result<CommandLog, StorageError>;

    /// All entries, oldest first.
    fn command_logs(&self) -> Result<Vec<CommandLog>, StorageError>;
}

/// In-process log store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<Vec<CommandLog>>,
}

fn now_millis() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    (millis.min(u64::MAX as u128)) as u64
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogStorage for MemoryStorage {
    fn log_command(&self, entry: NewCommandLog) -> Result<CommandLog, StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;

        let log = CommandLog {
            id: entries.len() as u64 + 1,
            command: entry.command,
            args: entry.args,
            user_rank: entry.user_rank,
            timestamp: now_millis(),
        };
        entries.push(log.clone());

        Ok(log)
    }

    fn command_logs(&self) -> Result<Vec<CommandLog>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        let mut logs = entries.clone();
        // Stable sort keeps insertion order for equal timestamps
        logs.sort_by_key(|log| log.timestamp);
        Ok(logs)
    }
}
