//! Workspace primitives for TexDesk: path resolution, tree listing and document CRUD.
//! TexDesk 工作區基礎元件：路徑解析、樹狀列舉與文件操作。

mod util;

pub mod paths;
pub mod store;
pub mod tree;

pub use paths::{PathError, PathResolver};
pub use store::{DocumentStore, StoreError, TEMPLATE_FILES};
pub use tree::{find_in, TreeBuilder, TreeError, TreeNode};
pub use util::write_atomic;

/// Reserved folder under the workspace root holding trashed items.
pub const TRASH_DIR_NAME: &str = ".trash";
