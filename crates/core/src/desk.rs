//! Single entry point wiring path resolution, documents, trash and compilation
//! over one workspace root.
//! 將路徑解析、文件、垃圾桶與編譯整合於單一工作區的進入點。

use std::fs;
use std::path::Path;
use std::sync::Arc;

use texdesk_compile::CompilationPipeline;
use texdesk_project::{DocumentStore, PathResolver, TreeBuilder, TreeNode, TRASH_DIR_NAME};
use texdesk_settings::DeskConfig;
use texdesk_trash::{Clock, ReconcileReport, TrashEntry, TrashManager};

use crate::error::DeskError;

/// A workspace opened for editing. Safe to share between threads.
/// 已開啟的工作區，可於多執行緒間共用。
#[derive(Debug)]
pub struct Desk {
    resolver: PathResolver,
    config: DeskConfig,
    documents: DocumentStore,
    tree: TreeBuilder,
    trash: TrashManager,
    compiler: CompilationPipeline,
}

impl Desk {
    /// Opens (creating if needed) the workspace at `root`.
    /// 開啟工作區；若資料夾不存在則建立。
    pub fn open(root: impl AsRef<Path>, config: DeskConfig) -> Result<Self, DeskError> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|source| DeskError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let resolver = PathResolver::new(root)?;
        let templates_dir = config.templates_dir_for(resolver.root());

        let documents = DocumentStore::new(resolver.clone()).with_templates_dir(templates_dir);
        let tree = TreeBuilder::new(resolver.clone(), TRASH_DIR_NAME);
        let trash = TrashManager::new(resolver.clone())?;
        let compiler = CompilationPipeline::new(resolver.clone(), config.compiler.clone());

        tracing::debug!(root = %resolver.root().display(), "workspace opened");
        Ok(Self {
            resolver,
            config,
            documents,
            tree,
            trash,
            compiler,
        })
    }

    /// Replaces the clock used to stamp trashed items.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.trash = self.trash.with_clock(clock);
        self
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn list_tree(&self) -> Result<Vec<TreeNode>, DeskError> {
        Ok(self.tree.build()?)
    }

    pub fn read(&self, path: &str) -> Result<String, DeskError> {
        Ok(self.documents.read(path)?)
    }

    pub fn write(&self, path: &str, content: &str) -> Result<(), DeskError> {
        Ok(self.documents.write(path, content)?)
    }

    pub fn mkdir(&self, path: &str) -> Result<(), DeskError> {
        Ok(self.documents.mkdir(path)?)
    }

    /// Renames in place and returns the new logical path.
    pub fn rename(&self, path: &str, new_name: &str) -> Result<String, DeskError> {
        Ok(self.documents.rename(path, new_name)?)
    }

    pub fn delete(&self, path: &str) -> Result<(), DeskError> {
        Ok(self.documents.delete(path)?)
    }

    pub fn trash(&self, path: &str) -> Result<TrashEntry, DeskError> {
        Ok(self.trash.trash(path)?)
    }

    /// Restores a trash slot (`.trash/<slot>`) and returns where it landed.
    /// 還原垃圾桶項目並回傳還原後的路徑。
    pub fn restore(&self, slot_path: &str) -> Result<String, DeskError> {
        Ok(self.trash.restore(slot_path)?)
    }

    pub fn list_trash(&self) -> Result<Vec<TrashEntry>, DeskError> {
        Ok(self.trash.list()?)
    }

    pub fn reconcile_trash(&self) -> Result<ReconcileReport, DeskError> {
        Ok(self.trash.reconcile()?)
    }

    /// Compiles a `.tex` document and returns the PDF bytes.
    /// 編譯 `.tex` 文件並回傳 PDF 內容。
    pub fn compile(&self, path: &str) -> Result<Vec<u8>, DeskError> {
        Ok(self.compiler.compile(path)?)
    }
}
