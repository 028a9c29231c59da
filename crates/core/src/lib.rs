//! TexDesk workspace facade: one [`Desk`] per workspace root.
//! TexDesk 工作區介面：每個工作區根目錄對應一個 [`Desk`]。

pub mod desk;
pub mod error;

pub use desk::Desk;
pub use error::{DeskError, ErrorKind};

pub use texdesk_project::{TreeNode, TRASH_DIR_NAME};
pub use texdesk_settings::{CompilerConfig, ConfigStore, DeskConfig};
pub use texdesk_trash::{Clock, ItemKind, ReconcileReport, TrashEntry};
