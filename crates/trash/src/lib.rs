//! Recoverable soft-delete for TexDesk workspaces.
//! TexDesk 工作區的可還原刪除（垃圾桶）。
//!
//! Items are moved into the reserved `.trash` folder under a generated slot
//! name, and a JSON ledger (`.trash/trash-info.json`) maps each slot back to
//! where it came from. The ledger is the source of truth for restores, but
//! both orphaned slots and orphaned entries are tolerated: they surface as
//! `NotFound` and can be cleaned up with [`TrashManager::reconcile`].

mod clock;
mod entry;
mod error;
mod ledger;
mod manager;
pub mod naming;

pub use clock::{Clock, SystemClock};
pub use entry::{ItemKind, TrashEntry};
pub use error::TrashError;
pub use ledger::{TrashLedger, CORRUPT_SUFFIX, LEDGER_FILE_NAME};
pub use manager::{ReconcileReport, TrashManager};
