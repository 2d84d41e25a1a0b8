//! # Storage Module - Player Persistence
//!
//! The roster is persisted as a single JSON document holding every player:
//!
//! ```text
//! data/
//! ├── players.json     ← current roster
//! ├── players.json.1   ← previous save
//! └── .players.lock    ← fs2 lock serializing writers
//! ```
//!
//! Writes go to a temp file in the same directory which is then renamed over
//! `players.json`, so a crash mid-save never leaves a truncated roster behind.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use battlebot::storage::{JsonPlayerStore, PlayerStore};
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = JsonPlayerStore::new("./data");
//!     let players = store.load_all()?;
//!     store.save_all(&players)?;
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Context, Result};
use fs2::FileExt;
use log::{debug, warn};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::battle::player::Player;

pub const PLAYERS_FILE: &str = "players.json";

/// Where the roster lives between runs.
pub trait PlayerStore: Send + Sync {
    fn load_all(&self) -> Result<Vec<Player>>;
    fn save_all(&self, players: &[Player]) -> Result<()>;
}

/// JSON file store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct JsonPlayerStore {
    data_dir: PathBuf,
}

impl JsonPlayerStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(PLAYERS_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.1", PLAYERS_FILE))
    }

    fn lock_path(&self) -> PathBuf {
        self.data_dir.join(".players.lock")
    }
}

impl PlayerStore for JsonPlayerStore {
    fn load_all(&self) -> Result<Vec<Player>> {
        let path = self.path();
        if !path.exists() {
            debug!("No roster at {}, starting empty", path.display());
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read roster {}", path.display()))?;
        let players: Vec<Player> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse roster {}", path.display()))?;
        Ok(players)
    }

    fn save_all(&self, players: &[Player]) -> Result<()> {
        fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create {}", self.data_dir.display()))?;
        let content = serde_json::to_string_pretty(players)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.lock_path())?;
        lock_file.lock_exclusive()?;

        let path = self.path();
        if path.exists() {
            if let Err(e) = fs::copy(&path, self.backup_path()) {
                warn!("Could not rotate {}: {}", path.display(), e);
            }
        }
        write_atomic(&path, &content)?;

        drop(lock_file);
        debug!("Saved {} players to {}", players.len(), path.display());
        Ok(())
    }
}

/// Replace `path` with `content` through a temp file and rename.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path.file_name().and_then(|s| s.to_str()).unwrap_or(PLAYERS_FILE);
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                tmp.write_all(content.as_bytes())?;
                tmp.flush()?;
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
                continue;
            }
            Err(e) => return Err(anyhow!("Failed to create temp file for atomic write: {}", e)),
        }
    };
    fs::rename(&tmp_path, path)?;
    // best-effort fsync of the directory so the rename survives a crash
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }
    Ok(())
}
