use std::io;
use std::path::PathBuf;
use std::time::Duration;

use texdesk_compile::CompileError;
use texdesk_project::{PathError, StoreError, TreeError};
use texdesk_settings::ConfigError;
use texdesk_trash::TrashError;
use thiserror::Error;

/// Fieldless error category, used by front ends to pick a status or exit code.
/// 無欄位的錯誤分類，供前端對應狀態碼或結束碼。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidPath,
    NotFound,
    AlreadyExists,
    Validation,
    Compilation,
    ToolMissing,
    Timeout,
    Io,
}

/// 工作台操作的統一錯誤型別。 / Unified error type for desk operations.
#[derive(Debug, Error)]
pub enum DeskError {
    #[error("{0}")]
    InvalidPath(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("{0}")]
    Validation(String),
    #[error("compilation failed:\n{message}")]
    Compilation { message: String },
    #[error("typesetting tool {program:?} is not installed; install TeX Live or configure compiler.program")]
    ToolMissing { program: String },
    #[error("compilation timed out after {0:?}")]
    Timeout(Duration),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no free name for {name} after {attempts} attempts")]
    NamesExhausted { name: String, attempts: u32 },
    #[error("trash ledger could not be encoded: {0}")]
    Ledger(#[source] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DeskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath(_) => ErrorKind::InvalidPath,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Compilation { .. } => ErrorKind::Compilation,
            Self::ToolMissing { .. } => ErrorKind::ToolMissing,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Io { .. } | Self::NamesExhausted { .. } | Self::Ledger(_) | Self::Config(_) => {
                ErrorKind::Io
            }
        }
    }
}

impl From<PathError> for DeskError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::Root { path, source } => Self::Io { path, source },
            other => Self::InvalidPath(other.to_string()),
        }
    }
}

impl From<StoreError> for DeskError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidPath(err) => err.into(),
            StoreError::NotFound(path) => Self::NotFound(path),
            StoreError::AlreadyExists(name) => Self::AlreadyExists(name),
            StoreError::Io { path, source } => Self::Io { path, source },
        }
    }
}

impl From<TreeError> for DeskError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::Io { path, source } => Self::Io { path, source },
        }
    }
}

impl From<TrashError> for DeskError {
    fn from(err: TrashError) -> Self {
        match err {
            TrashError::InvalidPath(err) => err.into(),
            TrashError::NotFound(path) => Self::NotFound(path),
            TrashError::Io { path, source } => Self::Io { path, source },
            TrashError::Encode(err) => Self::Ledger(err),
            TrashError::NamesExhausted { name, attempts } => {
                Self::NamesExhausted { name, attempts }
            }
        }
    }
}

impl From<CompileError> for DeskError {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::InvalidPath(err) => err.into(),
            CompileError::Validation(message) => Self::Validation(message),
            CompileError::Compilation { message } => Self::Compilation { message },
            CompileError::ToolMissing { program } => Self::ToolMissing { program },
            CompileError::Timeout { after, .. } => Self::Timeout(after),
            CompileError::Io { path, source } => Self::Io { path, source },
        }
    }
}
