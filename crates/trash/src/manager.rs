use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use texdesk_project::{PathResolver, TRASH_DIR_NAME};

use crate::clock::{Clock, SystemClock};
use crate::entry::{ItemKind, TrashEntry};
use crate::error::TrashError;
use crate::ledger::{TrashLedger, LEDGER_FILE_NAME};
use crate::naming::{restore_candidates, slot_candidates, MAX_RESTORE_PROBES, MAX_SLOT_PROBES};

/// Outcome of [`TrashManager::reconcile`].
/// 帳本與實體檔案對帳結果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Ledger entries dropped because their slot no longer exists.
    pub dropped: Vec<TrashEntry>,
    /// Slot names present on disk with no ledger entry.
    pub orphans: Vec<String>,
}

/// Moves items into the trash folder and back, keeping the ledger in step.
///
/// Trash, restore and reconcile are serialised by a workspace-scoped lock.
/// 將項目移入垃圾桶與還原，並同步維護帳本。
pub struct TrashManager {
    resolver: PathResolver,
    trash_dir: PathBuf,
    ledger: TrashLedger,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl std::fmt::Debug for TrashManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrashManager")
            .field("trash_dir", &self.trash_dir)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl TrashManager {
    /// Creates the manager, making sure the trash folder exists.
    /// 建立管理器並確保垃圾桶資料夾存在。
    pub fn new(resolver: PathResolver) -> Result<Self, TrashError> {
        let trash_dir = resolver.root().join(TRASH_DIR_NAME);
        fs::create_dir_all(&trash_dir).map_err(|err| TrashError::io(&trash_dir, err))?;
        let ledger = TrashLedger::new(&trash_dir);
        Ok(Self {
            resolver,
            trash_dir,
            ledger,
            clock: Arc::new(SystemClock),
            lock: Mutex::new(()),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }

    pub fn ledger(&self) -> &TrashLedger {
        &self.ledger
    }

    /// Moves `logical` into the trash and records where it came from.
    /// 將項目移入垃圾桶並記錄原始位置。
    pub fn trash(&self, logical: &str) -> Result<TrashEntry, TrashError> {
        let _guard = self.lock.lock();
        let source = self.resolver.resolve(logical)?;
        if self.resolver.is_root(&source) {
            return Err(TrashError::invalid(logical, "refers to the workspace root"));
        }
        if source.starts_with(&self.trash_dir) {
            return Err(TrashError::invalid(logical, "item is already in the trash"));
        }
        if source.symlink_metadata().is_err() {
            return Err(TrashError::NotFound(logical.to_string()));
        }
        fs::create_dir_all(&self.trash_dir).map_err(|err| TrashError::io(&self.trash_dir, err))?;

        let original_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| logical.to_string());
        let original_path = self
            .resolver
            .logical_id(&source)
            .unwrap_or_else(|| logical.to_string());
        let deleted_at = self.clock.now();

        let taken: HashSet<String> = self
            .ledger
            .entries()?
            .into_iter()
            .map(|entry| entry.slot_name)
            .collect();
        let slot_name = slot_candidates(&original_name, deleted_at)
            .find(|candidate| {
                !taken.contains(candidate)
                    && self.trash_dir.join(candidate).symlink_metadata().is_err()
            })
            .ok_or_else(|| TrashError::NamesExhausted {
                name: original_name.clone(),
                attempts: MAX_SLOT_PROBES,
            })?;

        let entry = TrashEntry {
            slot_name,
            original_name,
            original_path,
            deleted_at,
            kind: if source.is_dir() {
                ItemKind::Directory
            } else {
                ItemKind::File
            },
        };
        self.ledger.append(entry.clone())?;

        let destination = self.trash_dir.join(&entry.slot_name);
        if let Err(err) = fs::rename(&source, &destination) {
            if let Err(rollback) = self.ledger.remove(&entry.slot_name) {
                tracing::warn!(
                    slot = %entry.slot_name,
                    error = %rollback,
                    "failed to roll back ledger entry after move error"
                );
            }
            return Err(TrashError::io(&source, err));
        }

        tracing::info!(
            path = %entry.original_path,
            slot = %entry.slot_name,
            kind = ?entry.kind,
            "moved item to trash"
        );
        Ok(entry)
    }

    /// Restores a trash slot (`.trash/<slot>`) to its original location and
    /// returns the logical path it landed on.
    /// 還原垃圾桶槽位至原始位置，回傳實際還原的邏輯路徑。
    pub fn restore(&self, slot_logical: &str) -> Result<String, TrashError> {
        let _guard = self.lock.lock();
        let slot_path = self.resolver.resolve(slot_logical)?;
        if slot_path.parent() != Some(self.trash_dir.as_path()) {
            return Err(TrashError::invalid(slot_logical, "not a trash slot"));
        }
        if slot_path.symlink_metadata().is_err() {
            return Err(TrashError::NotFound(slot_logical.to_string()));
        }
        let slot_name = slot_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let entry = self
            .ledger
            .find(&slot_name)?
            .ok_or_else(|| TrashError::NotFound(slot_logical.to_string()))?;

        let original = self.resolver.resolve(&entry.original_path)?;
        if self.resolver.is_root(&original) || original.starts_with(&self.trash_dir) {
            return Err(TrashError::invalid(
                &entry.original_path,
                "ledger entry points at a reserved location",
            ));
        }
        let target = if original.symlink_metadata().is_err() {
            original
        } else {
            self.free_restore_target(&entry.original_path)?
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| TrashError::io(parent, err))?;
        }
        fs::rename(&slot_path, &target).map_err(|err| TrashError::io(&slot_path, err))?;
        let restored_id = self
            .resolver
            .logical_id(&target)
            .unwrap_or_else(|| entry.original_path.clone());

        if let Err(err) = self.ledger.remove(&slot_name) {
            tracing::error!(slot = %slot_name, error = %err, "item restored but ledger is stale");
            return Err(err);
        }
        tracing::info!(slot = %slot_name, path = %restored_id, "restored item from trash");
        Ok(restored_id)
    }

    /// Current ledger entries.
    pub fn list(&self) -> Result<Vec<TrashEntry>, TrashError> {
        self.ledger.entries()
    }

    /// Drops ledger entries whose slot is gone and reports slots on disk
    /// without an entry. Never touches the slots themselves.
    /// 對帳：移除無實體的帳本紀錄，並回報無紀錄的實體槽位。
    pub fn reconcile(&self) -> Result<ReconcileReport, TrashError> {
        let _guard = self.lock.lock();
        let dropped = self
            .ledger
            .retain(|entry| self.trash_dir.join(&entry.slot_name).symlink_metadata().is_ok())?;
        let known: HashSet<String> = self
            .ledger
            .entries()?
            .into_iter()
            .map(|entry| entry.slot_name)
            .collect();

        let mut orphans = Vec::new();
        if self.trash_dir.is_dir() {
            let listing =
                fs::read_dir(&self.trash_dir).map_err(|err| TrashError::io(&self.trash_dir, err))?;
            for item in listing {
                let item = item.map_err(|err| TrashError::io(&self.trash_dir, err))?;
                let name = item.file_name().to_string_lossy().into_owned();
                if name.starts_with(LEDGER_FILE_NAME) || known.contains(&name) {
                    continue;
                }
                orphans.push(name);
            }
        }
        orphans.sort();

        if !dropped.is_empty() || !orphans.is_empty() {
            tracing::warn!(
                dropped = dropped.len(),
                orphans = orphans.len(),
                "trash ledger reconciled"
            );
        }
        Ok(ReconcileReport { dropped, orphans })
    }

    fn free_restore_target(&self, original_path: &str) -> Result<PathBuf, TrashError> {
        for candidate in restore_candidates(original_path) {
            let path = self.resolver.resolve(&candidate)?;
            if path.symlink_metadata().is_err() {
                return Ok(path);
            }
        }
        Err(TrashError::NamesExhausted {
            name: original_path.to_string(),
            attempts: MAX_RESTORE_PROBES,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Local, TimeZone};
    use tempfile::tempdir;

    struct FixedClock(DateTime<Local>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            self.0
        }
    }

    fn manager(root: &Path) -> TrashManager {
        let clock = FixedClock(Local.with_ymd_and_hms(2024, 5, 1, 10, 11, 12).single().unwrap());
        TrashManager::new(PathResolver::new(root).unwrap())
            .unwrap()
            .with_clock(Arc::new(clock))
    }

    #[test]
    fn trash_records_entry_and_moves_item() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("ProjectA")).unwrap();
        fs::write(dir.path().join("ProjectA/notes.txt"), "hello").unwrap();
        let manager = manager(dir.path());

        let entry = manager.trash("ProjectA/notes.txt").unwrap();
        assert_eq!(entry.slot_name, "notes.txt_2024-05-01_10-11-12");
        assert_eq!(entry.original_name, "notes.txt");
        assert_eq!(entry.original_path, "ProjectA/notes.txt");
        assert_eq!(entry.kind, ItemKind::File);
        assert!(!dir.path().join("ProjectA/notes.txt").exists());
        assert_eq!(
            fs::read_to_string(manager.trash_dir().join(&entry.slot_name)).unwrap(),
            "hello"
        );
        assert_eq!(manager.list().unwrap(), vec![entry]);
    }

    #[test]
    fn same_name_in_same_second_gets_distinct_slots() {
        let dir = tempdir().unwrap();
        for folder in ["a", "b", "c"] {
            fs::create_dir_all(dir.path().join(folder)).unwrap();
            fs::write(dir.path().join(folder).join("main.tex"), folder).unwrap();
        }
        let manager = manager(dir.path());

        let slots: Vec<_> = ["a/main.tex", "b/main.tex", "c/main.tex"]
            .into_iter()
            .map(|path| manager.trash(path).unwrap().slot_name)
            .collect();
        assert_eq!(
            slots,
            [
                "main.tex_2024-05-01_10-11-12",
                "main.tex_2024-05-01_10-11-12_1",
                "main.tex_2024-05-01_10-11-12_2",
            ]
        );
    }

    #[test]
    fn trash_rejects_root_trash_contents_and_missing_items() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());

        assert!(matches!(manager.trash(""), Err(TrashError::InvalidPath(_))));
        assert!(matches!(manager.trash(".trash"), Err(TrashError::InvalidPath(_))));
        assert!(matches!(
            manager.trash(".trash/trash-info.json"),
            Err(TrashError::InvalidPath(_))
        ));
        assert!(matches!(manager.trash("../x"), Err(TrashError::InvalidPath(_))));
        assert!(matches!(manager.trash("ghost.txt"), Err(TrashError::NotFound(_))));
        assert!(manager.list().unwrap().is_empty());
    }

    #[test]
    fn restore_round_trips_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Thesis/chapters")).unwrap();
        fs::write(dir.path().join("Thesis/chapters/one.tex"), "one").unwrap();
        let manager = manager(dir.path());

        let entry = manager.trash("Thesis").unwrap();
        assert_eq!(entry.kind, ItemKind::Directory);
        assert!(!dir.path().join("Thesis").exists());

        let restored = manager.restore(&entry.slot_path(TRASH_DIR_NAME)).unwrap();
        assert_eq!(restored, "Thesis");
        assert_eq!(
            fs::read_to_string(dir.path().join("Thesis/chapters/one.tex")).unwrap(),
            "one"
        );
        assert!(manager.list().unwrap().is_empty());
    }

    #[test]
    fn restore_into_occupied_path_uses_restored_suffix() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("ProjectA")).unwrap();
        let manager = manager(dir.path());

        fs::write(dir.path().join("ProjectA/notes.txt"), "v1").unwrap();
        let first = manager.trash("ProjectA/notes.txt").unwrap();
        fs::write(dir.path().join("ProjectA/notes.txt"), "v2").unwrap();
        let second = manager.trash("ProjectA/notes.txt").unwrap();
        fs::write(dir.path().join("ProjectA/notes.txt"), "v3").unwrap();

        assert_eq!(
            manager.restore(&first.slot_path(TRASH_DIR_NAME)).unwrap(),
            "ProjectA/notes_restored1.txt"
        );
        assert_eq!(
            manager.restore(&second.slot_path(TRASH_DIR_NAME)).unwrap(),
            "ProjectA/notes_restored2.txt"
        );
        let read = |name: &str| fs::read_to_string(dir.path().join("ProjectA").join(name)).unwrap();
        assert_eq!(read("notes.txt"), "v3");
        assert_eq!(read("notes_restored1.txt"), "v1");
        assert_eq!(read("notes_restored2.txt"), "v2");
    }

    #[test]
    fn restore_recreates_missing_parent_folders() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Gone/deeper")).unwrap();
        fs::write(dir.path().join("Gone/deeper/file.tex"), "x").unwrap();
        let manager = manager(dir.path());

        let entry = manager.trash("Gone/deeper/file.tex").unwrap();
        fs::remove_dir_all(dir.path().join("Gone")).unwrap();

        let restored = manager.restore(&entry.slot_path(TRASH_DIR_NAME)).unwrap();
        assert_eq!(restored, "Gone/deeper/file.tex");
        assert!(dir.path().join("Gone/deeper/file.tex").is_file());
    }

    #[test]
    fn restore_requires_slot_and_entry() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());
        fs::write(manager.trash_dir().join("stray_2024"), "x").unwrap();
        fs::write(dir.path().join("outside.txt"), "x").unwrap();

        assert!(matches!(
            manager.restore(".trash/missing_slot"),
            Err(TrashError::NotFound(_))
        ));
        assert!(matches!(
            manager.restore(".trash/stray_2024"),
            Err(TrashError::NotFound(_))
        ));
        assert!(matches!(
            manager.restore("outside.txt"),
            Err(TrashError::InvalidPath(_))
        ));
        assert!(dir.path().join(".trash/stray_2024").exists());
    }

    #[test]
    fn stale_entry_degrades_to_not_found_and_reconcile_drops_it() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("draft.tex"), "x").unwrap();
        fs::write(dir.path().join("keep.tex"), "y").unwrap();
        let manager = manager(dir.path());

        let stale = manager.trash("draft.tex").unwrap();
        let kept = manager.trash("keep.tex").unwrap();
        fs::remove_file(manager.trash_dir().join(&stale.slot_name)).unwrap();
        fs::write(manager.trash_dir().join("orphan_item"), "z").unwrap();

        assert!(matches!(
            manager.restore(&stale.slot_path(TRASH_DIR_NAME)),
            Err(TrashError::NotFound(_))
        ));

        let report = manager.reconcile().unwrap();
        assert_eq!(report.dropped, vec![stale]);
        assert_eq!(report.orphans, vec!["orphan_item".to_string()]);
        assert_eq!(manager.list().unwrap(), vec![kept]);
        assert!(manager.trash_dir().join("orphan_item").exists());
    }

    #[test]
    fn tampered_entry_cannot_escape_root() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        let manager = manager(dir.path());
        let mut entry = manager.trash("a.txt").unwrap();
        manager.ledger().remove(&entry.slot_name).unwrap();
        let slot = entry.slot_path(TRASH_DIR_NAME);
        entry.original_path = "../../etc/a.txt".into();
        manager.ledger().append(entry).unwrap();

        assert!(matches!(manager.restore(&slot), Err(TrashError::InvalidPath(_))));
        assert!(dir.path().join(&slot).exists());
    }
}
