//! Role-scoped, persisted log of sent messages.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;
use crate::role::Role;
use crate::wire::MessageRecord;

/// Outcome of decoding a role's stored history.
///
/// Corruption is an explicit signal here so callers can log it; the
/// convenience accessors below degrade it to an empty history.
#[derive(Debug)]
pub enum HistoryDecode {
    Records(Vec<MessageRecord>),
    Missing,
    Corrupt(serde_json::Error),
}

/// Append-only message history, one JSON-array file per role.
///
/// Single-operator by construction: whole-file rewrites, no concurrent-writer
/// protection.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.aggprobe/history`, if a home directory exists.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".aggprobe").join("history"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, role: Role) -> PathBuf {
        self.dir.join(format!("messageHistory_{role}.json"))
    }

    /// Decode a role's stored history without hiding corruption.
    pub fn decode(&self, role: Role) -> HistoryDecode {
        let path = self.path_for(role);
        if !path.exists() {
            return HistoryDecode::Missing;
        }
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(role = %role, path = %path.display(), "history read failed: {error}");
                return HistoryDecode::Missing;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(records) => HistoryDecode::Records(records),
            Err(error) => HistoryDecode::Corrupt(error),
        }
    }

    /// All records for a role in append order; corruption degrades to an
    /// empty history, never an error.
    pub fn list(&self, role: Role) -> Vec<MessageRecord> {
        match self.decode(role) {
            HistoryDecode::Records(records) => records,
            HistoryDecode::Missing => Vec::new(),
            HistoryDecode::Corrupt(error) => {
                warn!(role = %role, "history is corrupt, treating as empty: {error}");
                Vec::new()
            }
        }
    }

    /// Record at `index`, `None` when out of bounds.
    pub fn get(&self, role: Role, index: usize) -> Option<MessageRecord> {
        self.list(role).into_iter().nth(index)
    }

    /// Append one record, rewriting the role's file whole.
    pub fn append(&self, role: Role, record: &MessageRecord) -> Result<()> {
        let mut records = self.list(role);
        records.push(record.clone());

        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(&records)?;
        let path = self.path_for(role);
        let tmp = tmp_path(&path);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let extension = path
        .extension()
        .map(|ext| format!("{}.tmp", ext.to_string_lossy()))
        .unwrap_or_else(|| "tmp".to_string());
    tmp.set_extension(extension);
    tmp
}
