use std::io;
use std::path::PathBuf;
use std::time::Duration;

use texdesk_project::PathError;
use thiserror::Error;

/// Errors produced while turning a `.tex` source into a PDF.
/// 將 `.tex` 原始檔轉換為 PDF 時可能發生的錯誤。
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),
    #[error("{0}")]
    Validation(String),
    #[error("compilation failed:\n{message}")]
    Compilation { message: String },
    #[error("typesetting tool {program:?} not found; install TeX Live or set compiler.program")]
    ToolMissing { program: String },
    #[error("compilation pass {pass} timed out after {after:?}")]
    Timeout { pass: u8, after: Duration },
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CompileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
