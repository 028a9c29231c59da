//! Candidate names for trash slots and restore targets.
//! 垃圾桶槽位與還原目標的候選名稱產生器。

use std::path::Path;

use chrono::{DateTime, Local};

/// Sortable, second-resolution timestamp embedded in slot names.
pub const SLOT_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
/// Upper bound on `_n` suffixes tried for one slot name.
pub const MAX_SLOT_PROBES: u32 = 1_000;
/// Upper bound on `_restoredN` suffixes tried for one restore.
pub const MAX_RESTORE_PROBES: u32 = 10_000;

/// Yields `{base}_{timestamp}` first, then `{base}_{timestamp}_{n}`.
/// 先產生 `{base}_{時間}`，其後附加 `_{n}`。
pub fn slot_candidates(base_name: &str, at: DateTime<Local>) -> impl Iterator<Item = String> {
    let stem = format!("{base_name}_{}", at.format(SLOT_TIME_FORMAT));
    std::iter::once(stem.clone()).chain((1..=MAX_SLOT_PROBES).map(move |n| format!("{stem}_{n}")))
}

/// Yields `{stem}_restored1{ext}`, `{stem}_restored2{ext}`, … for a logical path.
/// Only the final segment is split, so dots in parent folders are ignored.
/// 對邏輯路徑的最後一段切出主檔名與副檔名並依序編號。
pub fn restore_candidates(original_path: &str) -> impl Iterator<Item = String> {
    let (parent, name) = match original_path.rsplit_once('/') {
        Some((parent, name)) => (format!("{parent}/"), name.to_string()),
        None => (String::new(), original_path.to_string()),
    };
    let as_path = Path::new(&name);
    let (stem, ext) = match (as_path.file_stem(), as_path.extension()) {
        (Some(stem), Some(ext)) => (
            stem.to_string_lossy().into_owned(),
            format!(".{}", ext.to_string_lossy()),
        ),
        _ => (name.clone(), String::new()),
    };
    (1..=MAX_RESTORE_PROBES).map(move |n| format!("{parent}{stem}_restored{n}{ext}"))
}
