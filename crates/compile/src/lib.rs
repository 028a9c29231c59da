//! LaTeX to PDF compilation for TexDesk workspaces.
//! TexDesk 工作區的 LaTeX 轉 PDF 編譯流程。

pub mod diagnostics;
mod error;
pub mod pipeline;

pub use diagnostics::{extract_diagnostic, DiagnosticExtractor, LatexLogExtractor};
pub use error::CompileError;
pub use pipeline::{
    CompilationJob, CompilationPipeline, ARTIFACT_FILE_NAME, JOB_DIR_PREFIX, LOG_FILE_NAME,
    SOURCE_FILE_NAME,
};
