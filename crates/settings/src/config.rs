use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_VERSION: u32 = 1;

/// Directory (relative to the workspace root) holding desk-private state.
pub const CONFIG_DIR_NAME: &str = ".texdesk";
/// File name of the JSON configuration inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.json";
/// Default template-store directory name inside [`CONFIG_DIR_NAME`].
pub const TEMPLATES_DIR_NAME: &str = "templates";

const DEFAULT_PROGRAM: &str = "pdflatex";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeskConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Template store copied into new root-level folders. `None` means
    /// `<root>/.texdesk/templates`.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
    #[serde(default)]
    pub compiler: CompilerConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            templates_dir: None,
            compiler: CompilerConfig::default(),
        }
    }
}

impl DeskConfig {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = CONFIG_VERSION;
        }
        if matches!(&self.templates_dir, Some(path) if path.as_os_str().is_empty()) {
            self.templates_dir = None;
        }
        self.compiler.sanitize();
    }

    /// Location of the template store for a workspace rooted at `root`.
    pub fn templates_dir_for(&self, root: &Path) -> PathBuf {
        match &self.templates_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.join(CONFIG_DIR_NAME).join(TEMPLATES_DIR_NAME),
        }
    }
}

/// Settings for the external typesetting tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default = "default_program")]
    pub program: String,
    /// Extra arguments placed before the standard flag set (wrappers such as
    /// `nice` or a container launcher).
    #[serde(default)]
    pub program_args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub shell_escape: bool,
    /// Parent directory for per-job working directories; system temp when unset.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

fn default_program() -> String {
    DEFAULT_PROGRAM.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            program_args: Vec::new(),
            timeout_secs: default_timeout_secs(),
            shell_escape: false,
            scratch_dir: None,
        }
    }
}

impl CompilerConfig {
    fn sanitize(&mut self) {
        if self.program.trim().is_empty() {
            self.program = default_program();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self.timeout_secs = self.timeout_secs.clamp(1, MAX_TIMEOUT_SECS);
        if matches!(&self.scratch_dir, Some(path) if path.as_os_str().is_empty()) {
            self.scratch_dir = None;
        }
    }
}

/// Loads [`DeskConfig`] from its JSON file. The file is edited by hand;
/// the desk never writes it.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    data: DeskConfig,
}

impl ConfigStore {
    /// Default config path for a workspace root.
    pub fn default_path(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let mut data = DeskConfig::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: DeskConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn config(&self) -> &DeskConfig {
        &self.data
    }

    pub fn into_config(self) -> DeskConfig {
        self.data
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
