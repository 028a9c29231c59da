//! Two-pass LaTeX build inside an isolated, self-cleaning working directory.
//! 在獨立且會自動清理的工作目錄中執行兩次 LaTeX 編譯。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::{Builder, TempDir};
use texdesk_project::PathResolver;
use texdesk_runexec::{RunError, RunExecutor, RunSpec};
use texdesk_settings::CompilerConfig;
use tracing::{debug, info, warn};

use crate::diagnostics::{DiagnosticExtractor, LatexLogExtractor};
use crate::error::CompileError;

pub const SOURCE_FILE_NAME: &str = "main.tex";
pub const ARTIFACT_FILE_NAME: &str = "main.pdf";
pub const LOG_FILE_NAME: &str = "main.log";
pub const JOB_DIR_PREFIX: &str = "texdesk-compile-";
pub const PASSES: u8 = 2;

const SOURCE_SUFFIX: &str = ".tex";
const LOG_TAIL_BYTES: usize = 2048;
const NO_OUTPUT_MESSAGE: &str = "Compilation failed. No PDF generated.";

/// Builds PDFs from workspace `.tex` files with an external tool.
/// 使用外部工具將工作區中的 `.tex` 檔編譯為 PDF。
pub struct CompilationPipeline {
    resolver: PathResolver,
    config: CompilerConfig,
    extractor: Arc<dyn DiagnosticExtractor>,
}

impl std::fmt::Debug for CompilationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilationPipeline")
            .field("resolver", &self.resolver)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CompilationPipeline {
    pub fn new(resolver: PathResolver, config: CompilerConfig) -> Self {
        Self {
            resolver,
            config,
            extractor: Arc::new(LatexLogExtractor::default()),
        }
    }

    /// Replaces the log heuristic used for failed builds.
    /// 替換編譯失敗時使用的記錄解析規則。
    pub fn with_extractor(mut self, extractor: Arc<dyn DiagnosticExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles the document at `logical` and returns the PDF bytes.
    /// 編譯指定文件並回傳 PDF 內容。
    pub fn compile(&self, logical: &str) -> Result<Vec<u8>, CompileError> {
        let source_path = self.resolver.resolve(logical)?;
        let is_tex = source_path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(SOURCE_SUFFIX));
        if !is_tex {
            return Err(CompileError::Validation(format!(
                "only .tex files can be compiled: {logical}"
            )));
        }
        if !source_path.is_file() {
            return Err(CompileError::Validation(format!(
                "file not found or not a regular file: {logical}"
            )));
        }
        let source = fs::read_to_string(&source_path)
            .map_err(|source| CompileError::io(&source_path, source))?;

        let job = CompilationJob::create(self.config.scratch_dir.as_deref())?;
        job.write_source(&source)?;
        info!(path = logical, job = %job.dir().display(), "compiling document");

        let timeout = Duration::from_secs(self.config.timeout_secs.max(1));
        for pass in 1..=PASSES {
            self.run_pass(&job, pass, timeout)?;
        }

        let artifact = job.dir().join(ARTIFACT_FILE_NAME);
        if !artifact.is_file() {
            let message = match fs::read(job.dir().join(LOG_FILE_NAME)) {
                Ok(bytes) => self.extractor.extract(&String::from_utf8_lossy(&bytes)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => NO_OUTPUT_MESSAGE.to_string(),
                Err(err) => return Err(CompileError::io(job.dir().join(LOG_FILE_NAME), err)),
            };
            info!(path = logical, "compilation produced no PDF");
            return Err(CompileError::Compilation { message });
        }

        let bytes = fs::read(&artifact).map_err(|source| CompileError::io(&artifact, source))?;
        info!(path = logical, size = bytes.len(), "compilation finished");
        Ok(bytes)
    }

    fn run_pass(&self, job: &CompilationJob, pass: u8, timeout: Duration) -> Result<(), CompileError> {
        let spec = self.command_for(job.dir(), timeout);
        debug!(pass, program = %spec.program, args = ?spec.args, "starting compile pass");

        let result = RunExecutor::execute(&spec).map_err(|err| match err {
            RunError::ProgramNotFound(program) => CompileError::ToolMissing { program },
            RunError::Spawn(source) | RunError::Poll(source) | RunError::Kill(source) => {
                CompileError::io(&spec.program, source)
            }
        })?;

        if result.timed_out {
            warn!(pass, after = ?timeout, "compile pass timed out; process killed");
            return Err(CompileError::Timeout {
                pass,
                after: timeout,
            });
        }
        if result.output_truncated {
            warn!(pass, "tool output still held open at the deadline; stopped reading");
        }
        // A non-zero exit is not fatal on its own: the second pass and the
        // artifact check decide.
        if result.success() {
            debug!(pass, elapsed = ?result.duration, "compile pass finished");
        } else {
            debug!(
                pass,
                exit_code = ?result.exit_code,
                elapsed = ?result.duration,
                stdout = %tail(&result.stdout),
                stderr = %tail(&result.stderr),
                "compile pass reported errors"
            );
        }
        Ok(())
    }

    fn command_for(&self, dir: &Path, timeout: Duration) -> RunSpec {
        let mut spec = RunSpec::new(self.config.program.clone())
            .with_args(self.config.program_args.iter().cloned());
        if self.config.shell_escape {
            spec = spec.push_arg("-shell-escape");
        }
        spec.with_args(["-interaction=nonstopmode", "-halt-on-error", "-output-directory"])
            .push_arg(dir.to_string_lossy())
            .push_arg(dir.join(SOURCE_FILE_NAME).to_string_lossy())
            .with_working_dir(dir)
            .with_timeout(timeout)
    }
}

fn tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(LOG_TAIL_BYTES);
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}

/// Per-request working directory; removed when dropped on every exit path.
/// 單次編譯的工作目錄，離開時一律移除。
#[derive(Debug)]
pub struct CompilationJob {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl CompilationJob {
    pub fn create(scratch_dir: Option<&Path>) -> Result<Self, CompileError> {
        let mut builder = Builder::new();
        builder.prefix(JOB_DIR_PREFIX);
        let dir = match scratch_dir {
            Some(parent) => {
                fs::create_dir_all(parent).map_err(|source| CompileError::io(parent, source))?;
                builder
                    .tempdir_in(parent)
                    .map_err(|source| CompileError::io(parent, source))?
            }
            None => builder
                .tempdir()
                .map_err(|source| CompileError::io(std::env::temp_dir(), source))?,
        };
        let path = dir.path().to_path_buf();
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.path
    }

    fn write_source(&self, source: &str) -> Result<(), CompileError> {
        let target = self.path.join(SOURCE_FILE_NAME);
        fs::write(&target, source).map_err(|err| CompileError::io(target, err))
    }
}

impl Drop for CompilationJob {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(err) = dir.close() {
                warn!(job = %self.path.display(), error = %err, "failed to remove compile directory");
            }
        }
    }
}
