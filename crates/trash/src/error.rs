use std::io;
use std::path::PathBuf;

use texdesk_project::PathError;
use thiserror::Error;

/// Errors raised by the trash subsystem.
/// 垃圾桶子系統的錯誤。
#[derive(Debug, Error)]
pub enum TrashError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode trash ledger: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("no free name for {name} after {attempts} attempts")]
    NamesExhausted { name: String, attempts: u32 },
}

impl TrashError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(path: &str, reason: &'static str) -> Self {
        Self::InvalidPath(PathError::Invalid {
            path: path.to_string(),
            reason,
        })
    }
}
