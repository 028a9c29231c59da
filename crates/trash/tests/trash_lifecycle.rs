use std::fs;
use std::sync::Arc;
use std::thread;

use tempfile::tempdir;
use texdesk_project::{PathResolver, TRASH_DIR_NAME};
use texdesk_trash::{TrashError, TrashManager, LEDGER_FILE_NAME};

#[test]
fn concurrent_trash_operations_keep_every_ledger_entry() {
    let dir = tempdir().expect("temp dir");
    for index in 0..8 {
        let folder = dir.path().join(format!("project{index}"));
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("main.tex"), format!("doc {index}")).unwrap();
    }
    let manager = Arc::new(TrashManager::new(PathResolver::new(dir.path()).unwrap()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|index| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.trash(&format!("project{index}/main.tex")))
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread").expect("trash");
    }

    let entries = manager.list().unwrap();
    assert_eq!(entries.len(), 8);
    for entry in &entries {
        assert!(manager.trash_dir().join(&entry.slot_name).is_file());
    }

    // Restore everything concurrently as well; originals come back intact.
    let slots: Vec<_> = entries
        .iter()
        .map(|entry| entry.slot_path(TRASH_DIR_NAME))
        .collect();
    let handles: Vec<_> = slots
        .into_iter()
        .map(|slot| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.restore(&slot))
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread").expect("restore");
    }
    assert!(manager.list().unwrap().is_empty());
    for index in 0..8 {
        let restored = dir.path().join(format!("project{index}/main.tex"));
        assert_eq!(fs::read_to_string(restored).unwrap(), format!("doc {index}"));
    }
}

#[test]
fn missing_ledger_makes_slots_unrestorable_but_not_fatal() {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("report.tex"), "body").unwrap();
    let manager = TrashManager::new(PathResolver::new(dir.path()).unwrap()).unwrap();

    let entry = manager.trash("report.tex").unwrap();
    fs::remove_file(manager.trash_dir().join(LEDGER_FILE_NAME)).unwrap();

    let err = manager.restore(&entry.slot_path(TRASH_DIR_NAME)).unwrap_err();
    assert!(matches!(err, TrashError::NotFound(_)));
    assert!(manager.trash_dir().join(&entry.slot_name).exists());

    let report = manager.reconcile().unwrap();
    assert!(report.dropped.is_empty());
    assert_eq!(report.orphans, vec![entry.slot_name.clone()]);
}

#[test]
fn corrupt_ledger_degrades_then_recovers_on_next_trash() {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("a.tex"), "a").unwrap();
    fs::write(dir.path().join("b.tex"), "b").unwrap();
    let manager = TrashManager::new(PathResolver::new(dir.path()).unwrap()).unwrap();

    let first = manager.trash("a.tex").unwrap();
    fs::write(manager.trash_dir().join(LEDGER_FILE_NAME), "[[[").unwrap();
    assert!(matches!(
        manager.restore(&first.slot_path(TRASH_DIR_NAME)),
        Err(TrashError::NotFound(_))
    ));

    let second = manager.trash("b.tex").unwrap();
    assert_eq!(manager.list().unwrap(), vec![second.clone()]);
    assert!(manager
        .trash_dir()
        .join(format!("{LEDGER_FILE_NAME}.corrupt"))
        .is_file());

    assert_eq!(manager.restore(&second.slot_path(TRASH_DIR_NAME)).unwrap(), "b.tex");
}
