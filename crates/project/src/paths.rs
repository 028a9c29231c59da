//! Logical-path resolution confined to the workspace root.
//! 將邏輯路徑解析為工作區內的實體路徑，並阻擋目錄穿越。

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Errors raised while mapping a logical path onto the workspace.
/// 邏輯路徑解析失敗時的錯誤。
#[derive(Debug, Error)]
pub enum PathError {
    #[error("invalid path {path:?}: {reason}")]
    Invalid { path: String, reason: &'static str },
    #[error("path {path:?} escapes the workspace root")]
    Escapes { path: String },
    #[error("workspace root {path} is unavailable: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PathError {
    fn invalid(path: &str, reason: &'static str) -> Self {
        Self::Invalid {
            path: path.to_string(),
            reason,
        }
    }
}

/// Maps forward-slash logical paths to absolute paths under a single root.
/// 把以 `/` 分隔的邏輯路徑映射到唯一根目錄之下。
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Binds the resolver to an existing directory. The root is canonicalised
    /// so containment checks compare like with like.
    /// 綁定至既有資料夾；根目錄會先正規化以便比對。
    pub fn new(root: impl AsRef<Path>) -> Result<Self, PathError> {
        let root = root.as_ref();
        let canonical = root.canonicalize().map_err(|source| PathError::Root {
            path: root.to_path_buf(),
            source,
        })?;
        if !canonical.is_dir() {
            return Err(PathError::Root {
                path: root.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            });
        }
        Ok(Self { root: canonical })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `logical` beneath the root. The empty path names the root.
    /// 解析邏輯路徑；空字串代表根目錄本身。
    pub fn resolve(&self, logical: &str) -> Result<PathBuf, PathError> {
        if logical.contains('\0') {
            return Err(PathError::invalid(logical, "contains a NUL byte"));
        }
        if logical.starts_with('/') || logical.starts_with('\\') || Path::new(logical).has_root()
        {
            return Err(PathError::invalid(logical, "absolute paths are not allowed"));
        }

        let mut resolved = self.root.clone();
        for segment in logical.split('/') {
            for component in Path::new(segment).components() {
                match component {
                    Component::Normal(name) => resolved.push(name),
                    Component::CurDir => {}
                    Component::ParentDir => {
                        return Err(PathError::invalid(logical, "parent segments are not allowed"))
                    }
                    Component::RootDir | Component::Prefix(_) => {
                        return Err(PathError::invalid(logical, "absolute paths are not allowed"))
                    }
                }
            }
        }

        self.ensure_contained(logical, &resolved)?;
        Ok(resolved)
    }

    /// Converts an absolute path under the root back into its logical id.
    /// 將根目錄下的絕對路徑轉回邏輯代號。
    pub fn logical_id(&self, absolute: &Path) -> Option<String> {
        let relative = absolute.strip_prefix(&self.root).ok()?;
        let segments: Vec<String> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Some(segments.join("/"))
    }

    pub fn is_root(&self, path: &Path) -> bool {
        path == self.root
    }

    // Symlinks are followed through the nearest existing ancestor; a link
    // that cannot be resolved is refused since its target is unknown.
    fn ensure_contained(&self, logical: &str, candidate: &Path) -> Result<(), PathError> {
        let mut probe = candidate;
        loop {
            if probe == self.root {
                return Ok(());
            }
            match probe.canonicalize() {
                Ok(real) if real.starts_with(&self.root) => return Ok(()),
                Ok(_) => {
                    return Err(PathError::Escapes {
                        path: logical.to_string(),
                    })
                }
                Err(_) if probe.symlink_metadata().is_ok() => {
                    return Err(PathError::Escapes {
                        path: logical.to_string(),
                    })
                }
                Err(_) => match probe.parent() {
                    Some(parent) => probe = parent,
                    None => return Ok(()),
                },
            }
        }
    }
}
