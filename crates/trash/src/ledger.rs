use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use texdesk_project::write_atomic;

use crate::entry::TrashEntry;
use crate::error::TrashError;

/// Name of the ledger file inside the trash folder.
pub const LEDGER_FILE_NAME: &str = "trash-info.json";
/// Suffix given to an unreadable ledger before it is replaced.
pub const CORRUPT_SUFFIX: &str = ".corrupt";
const MAX_CORRUPT_BACKUPS: u32 = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    items: Vec<TrashEntry>,
}

enum Loaded {
    Missing,
    Parsed(Vec<TrashEntry>),
    Corrupt,
}

impl Loaded {
    fn into_entries(self) -> Vec<TrashEntry> {
        match self {
            Loaded::Parsed(entries) => entries,
            Loaded::Missing | Loaded::Corrupt => Vec::new(),
        }
    }
}

/// Durable record of trash slots, rewritten in full on every mutation.
///
/// Every load-modify-save cycle runs under one lock, so concurrent callers
/// in this process never lose each other's updates. A missing file is an
/// empty ledger; an unparseable one is logged, read as empty and set aside
/// as `trash-info.json.corrupt` (then `.corrupt.1`, `.corrupt.2`, ...) on
/// the next write.
/// 垃圾桶帳本：每次變更都完整重寫，並以互斥鎖保護讀取-修改-寫回流程。
#[derive(Debug)]
pub struct TrashLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TrashLedger {
    pub fn new(trash_dir: &Path) -> Self {
        Self {
            path: trash_dir.join(LEDGER_FILE_NAME),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries in ledger order.
    pub fn entries(&self) -> Result<Vec<TrashEntry>, TrashError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.into_entries())
    }

    /// Looks up the entry for a slot name.
    pub fn find(&self, slot_name: &str) -> Result<Option<TrashEntry>, TrashError> {
        Ok(self
            .entries()?
            .into_iter()
            .find(|entry| entry.slot_name == slot_name))
    }

    pub fn append(&self, entry: TrashEntry) -> Result<(), TrashError> {
        self.update(|entries| entries.push(entry))
    }

    /// Removes the entry for `slot_name`, returning it when present.
    pub fn remove(&self, slot_name: &str) -> Result<Option<TrashEntry>, TrashError> {
        self.update(|entries| {
            let index = entries
                .iter()
                .position(|entry| entry.slot_name == slot_name)?;
            Some(entries.remove(index))
        })
    }

    /// Keeps entries matching `keep` and returns the dropped ones.
    pub fn retain<F>(&self, mut keep: F) -> Result<Vec<TrashEntry>, TrashError>
    where
        F: FnMut(&TrashEntry) -> bool,
    {
        self.update(|entries| {
            let (kept, dropped): (Vec<_>, Vec<_>) = entries.drain(..).partition(|e| keep(e));
            *entries = kept;
            dropped
        })
    }

    fn update<R, F>(&self, op: F) -> Result<R, TrashError>
    where
        F: FnOnce(&mut Vec<TrashEntry>) -> R,
    {
        let _guard = self.lock.lock();
        let loaded = self.load()?;
        let corrupt = matches!(loaded, Loaded::Corrupt);
        let mut entries = loaded.into_entries();
        let before = entries.clone();
        let result = op(&mut entries);

        if entries == before && !corrupt {
            return Ok(result);
        }
        if corrupt {
            self.set_aside_corrupt();
        }
        self.save(entries)?;
        Ok(result)
    }

    fn load(&self) -> Result<Loaded, TrashError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Loaded::Missing),
            Err(err) if err.kind() == ErrorKind::InvalidData => {
                tracing::warn!(path = %self.path.display(), "trash ledger is not UTF-8; treating as empty");
                return Ok(Loaded::Corrupt);
            }
            Err(err) => return Err(TrashError::io(&self.path, err)),
        };
        match serde_json::from_str::<LedgerFile>(&contents) {
            Ok(file) => Ok(Loaded::Parsed(file.items)),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "trash ledger is unreadable; treating as empty"
                );
                Ok(Loaded::Corrupt)
            }
        }
    }

    fn save(&self, items: Vec<TrashEntry>) -> Result<(), TrashError> {
        let payload = serde_json::to_vec_pretty(&LedgerFile { items })?;
        write_atomic(&self.path, &payload).map_err(|err| TrashError::io(&self.path, err))
    }

    /// First backup name not already taken, so earlier backups survive.
    fn free_backup_path(&self) -> Option<PathBuf> {
        (0..MAX_CORRUPT_BACKUPS)
            .map(|n| {
                let mut name = self.path.clone().into_os_string();
                name.push(CORRUPT_SUFFIX);
                if n > 0 {
                    name.push(format!(".{n}"));
                }
                PathBuf::from(name)
            })
            .find(|candidate| candidate.symlink_metadata().is_err())
    }

    fn set_aside_corrupt(&self) {
        let Some(backup) = self.free_backup_path() else {
            tracing::warn!(
                limit = MAX_CORRUPT_BACKUPS,
                "no free name to keep unreadable trash ledger aside"
            );
            return;
        };
        match fs::rename(&self.path, &backup) {
            Ok(()) => {
                tracing::warn!(backup = %backup.display(), "kept unreadable trash ledger aside")
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to keep unreadable trash ledger aside")
            }
        }
    }
}
