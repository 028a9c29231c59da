//! Plain document CRUD over the workspace, validated through [`PathResolver`].
//! 經由 [`PathResolver`] 驗證的文件讀寫、建立資料夾、更名與刪除。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::paths::{PathError, PathResolver};
use crate::util::write_atomic;

/// Template resources copied into every new root-level folder.
pub const TEMPLATE_FILES: [&str; 2] = ["main.tex", "Makefile"];

/// Errors surfaced by [`DocumentStore`].
/// [`DocumentStore`] 可能回傳的錯誤。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("an item named {0:?} already exists")]
    AlreadyExists(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    fn invalid(path: &str, reason: &'static str) -> Self {
        Self::InvalidPath(PathError::Invalid {
            path: path.to_string(),
            reason,
        })
    }
}

/// Facade over direct filesystem operations on workspace documents.
/// 工作區文件的直接檔案操作介面。
#[derive(Debug, Clone)]
pub struct DocumentStore {
    resolver: PathResolver,
    templates_dir: Option<PathBuf>,
}

impl DocumentStore {
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            templates_dir: None,
        }
    }

    /// Sets the template store used to seed root-level folders.
    /// 設定用於新根層資料夾的範本來源。
    pub fn with_templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = Some(dir.into());
        self
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Reads a text document.
    /// 讀取文字文件。
    pub fn read(&self, logical: &str) -> Result<String, StoreError> {
        let path = self.resolver.resolve(logical)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(logical.to_string()));
        }
        fs::read_to_string(&path).map_err(|err| StoreError::io(path, err))
    }

    /// Creates or replaces a document, creating parent folders as needed.
    /// 建立或覆寫文件，必要時建立上層資料夾。
    pub fn write(&self, logical: &str, content: &str) -> Result<(), StoreError> {
        let path = self.resolve_non_root(logical)?;
        if path.is_dir() {
            return Err(StoreError::io(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "target is a directory"),
            ));
        }
        write_atomic(&path, content.as_bytes()).map_err(|err| StoreError::io(&path, err))?;
        tracing::debug!(path = %logical, bytes = content.len(), "document written");
        Ok(())
    }

    /// Creates a folder (idempotent) and seeds root-level folders from the
    /// template store.
    /// 建立資料夾（可重複呼叫）；根層資料夾會複製範本。
    pub fn mkdir(&self, logical: &str) -> Result<(), StoreError> {
        let path = self.resolve_non_root(logical)?;
        if path.exists() && !path.is_dir() {
            return Err(StoreError::AlreadyExists(logical.to_string()));
        }
        fs::create_dir_all(&path).map_err(|err| StoreError::io(&path, err))?;
        tracing::info!(path = %logical, "directory created");

        let is_trash = path == self.resolver.root().join(crate::TRASH_DIR_NAME);
        if path.parent() == Some(self.resolver.root()) && !is_trash {
            self.seed_templates(&path);
        }
        Ok(())
    }

    /// Renames an item within its parent folder and returns the new logical id.
    /// 在同一上層資料夾內更名，回傳新的邏輯代號。
    pub fn rename(&self, logical: &str, new_name: &str) -> Result<String, StoreError> {
        validate_name(new_name)?;
        let source = self.resolve_non_root(logical)?;
        if source.symlink_metadata().is_err() {
            return Err(StoreError::NotFound(logical.to_string()));
        }

        let parent_id = source
            .parent()
            .and_then(|parent| self.resolver.logical_id(parent))
            .unwrap_or_default();
        let target_id = if parent_id.is_empty() {
            new_name.to_string()
        } else {
            format!("{parent_id}/{new_name}")
        };
        let target = self.resolver.resolve(&target_id)?;

        if target == source {
            return Ok(target_id);
        }
        if target.symlink_metadata().is_ok() && !same_entry(&source, &target) {
            return Err(StoreError::AlreadyExists(new_name.to_string()));
        }

        fs::rename(&source, &target).map_err(|err| StoreError::io(&source, err))?;
        tracing::info!(from = %logical, to = %target_id, "item renamed");
        Ok(target_id)
    }

    /// Permanently deletes a file or folder (recursively).
    /// 永久刪除檔案或資料夾（遞迴）。
    pub fn delete(&self, logical: &str) -> Result<(), StoreError> {
        let path = self.resolve_non_root(logical)?;
        let metadata = path
            .symlink_metadata()
            .map_err(|_| StoreError::NotFound(logical.to_string()))?;
        if metadata.is_dir() {
            fs::remove_dir_all(&path).map_err(|err| StoreError::io(&path, err))?;
        } else {
            fs::remove_file(&path).map_err(|err| StoreError::io(&path, err))?;
        }
        tracing::info!(path = %logical, "item deleted");
        Ok(())
    }

    fn resolve_non_root(&self, logical: &str) -> Result<PathBuf, StoreError> {
        let path = self.resolver.resolve(logical)?;
        if self.resolver.is_root(&path) {
            return Err(StoreError::invalid(logical, "refers to the workspace root"));
        }
        Ok(path)
    }

    fn seed_templates(&self, folder: &Path) {
        let Some(templates) = &self.templates_dir else {
            tracing::warn!("no template store configured; skipping seed");
            return;
        };
        for name in TEMPLATE_FILES {
            let template = templates.join(name);
            let destination = folder.join(name);
            if !template.is_file() {
                tracing::warn!(template = %template.display(), "template not found");
                continue;
            }
            if destination.exists() {
                tracing::debug!(destination = %destination.display(), "keeping existing file");
                continue;
            }
            match fs::copy(&template, &destination) {
                Ok(bytes) => {
                    tracing::info!(destination = %destination.display(), bytes, "template copied")
                }
                Err(err) => {
                    tracing::warn!(template = %template.display(), error = %err, "template copy failed")
                }
            }
        }
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name == "." || name == ".." {
        Some("name is a relative segment")
    } else if name.contains(['/', '\\', '\0']) {
        Some("name must be a single path segment")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(StoreError::invalid(name, reason)),
        None => Ok(()),
    }
}

// Case-only renames on case-insensitive filesystems see the target as existing.
fn same_entry(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}
