//! Persistence for finished games.
//!
//! Records are append-only and keyed by a synthetic id assigned on save.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::session::GameRecord;

/// Failure to persist or load records.
#[derive(Debug, Display, Error, From)]
pub enum StoreError {
    #[display("store I/O failed: {_0}")]
    Io(std::io::Error),
    #[display("bad record: {_0}")]
    Json(serde_json::Error),
}

/// A record together with the id the store gave it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredGame {
    pub id: u64,
    #[serde(flatten)]
    pub record: GameRecord,
}

/// Where finished games go. Sessions on many tasks share one store.
pub trait GameStore: Send + Sync {
    /// Persist `record` and return its id.
    fn save(&self, record: &GameRecord) -> Result<u64, StoreError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One JSON object per line in a plain file.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    next_id: Mutex<u64>,
}

impl JsonLinesStore {
    /// Open (or prepare to create) the file at `path`. Ids continue after the
    /// highest one already present.
    #[instrument(fields(path = %path.as_ref().display()), skip(path))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let existing = read_all(&path)?;
        let next_id = existing.iter().map(|g| g.id).max().unwrap_or(0) + 1;
        info!(records = existing.len(), next_id, "game store opened");
        Ok(Self {
            path,
            next_id: Mutex::new(next_id),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in the file, oldest first.
    pub fn load(&self) -> Result<Vec<StoredGame>, StoreError> {
        let _guard = lock(&self.next_id);
        read_all(&self.path)
    }
}

fn read_all(path: &Path) -> Result<Vec<StoredGame>, StoreError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut games = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        games.push(serde_json::from_str(&line)?);
    }
    Ok(games)
}

impl GameStore for JsonLinesStore {
    fn save(&self, record: &GameRecord) -> Result<u64, StoreError> {
        let mut next_id = lock(&self.next_id);
        let stored = StoredGame {
            id: *next_id,
            record: record.clone(),
        };
        let line = serde_json::to_string(&stored)?;

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;

        *next_id += 1;
        debug!(id = stored.id, path = %self.path.display(), "record appended");
        Ok(stored.id)
    }
}

/// Keeps records in memory. Handy for tests and the demo.
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: Mutex<Vec<StoredGame>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn games(&self) -> Vec<StoredGame> {
        lock(&self.games).clone()
    }
}

impl GameStore for MemoryStore {
    fn save(&self, record: &GameRecord) -> Result<u64, StoreError> {
        let mut games = lock(&self.games);
        let id = games.len() as u64 + 1;
        games.push(StoredGame {
            id,
            record: record.clone(),
        });
        Ok(id)
    }
}
