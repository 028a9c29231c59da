use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths::PathResolver;

/// One entry of the workspace listing. Directories carry `children`, files
/// do not.
/// 工作區清單中的節點；資料夾帶有 `children`，檔案則無。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: None,
        }
    }

    pub fn directory(id: impl Into<String>, name: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: Some(children),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.children.is_some()
    }

    /// Finds a node by logical id in this subtree.
    /// 依邏輯代號在子樹中尋找節點。
    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .as_deref()
            .and_then(|children| find_in(children, id))
    }
}

/// Searches a listing (as returned by [`TreeBuilder::build`]) for `id`.
pub fn find_in<'a>(nodes: &'a [TreeNode], id: &str) -> Option<&'a TreeNode> {
    nodes.iter().find_map(|node| node.find(id))
}

/// Tree-listing errors.
/// 樹狀列舉錯誤。
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("failed to list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Enumerates the workspace into an ordered hierarchy, hiding dot-entries
/// except the trash directory.
/// 依名稱排序列舉工作區；除垃圾桶資料夾外隱藏點開頭的項目。
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    resolver: PathResolver,
    visible_hidden: String,
}

impl TreeBuilder {
    pub fn new(resolver: PathResolver, visible_hidden: impl Into<String>) -> Self {
        Self {
            resolver,
            visible_hidden: visible_hidden.into(),
        }
    }

    /// Lists the whole workspace.
    /// 列舉整個工作區。
    pub fn build(&self) -> Result<Vec<TreeNode>, TreeError> {
        self.build_tree(self.resolver.root())
    }

    /// Lists `directory` recursively, depth-first.
    /// 深度優先遞迴列舉指定資料夾。
    pub fn build_tree(&self, directory: &Path) -> Result<Vec<TreeNode>, TreeError> {
        let io_err = |source| TreeError::Io {
            path: directory.to_path_buf(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(directory).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') && name != self.visible_hidden {
                continue;
            }
            // `file_type` does not follow symlinks: links are listed as leaves.
            let is_dir = entry.file_type().map_err(io_err)?.is_dir();
            entries.push((name, is_dir));
        }
        entries.sort();

        let mut nodes = Vec::with_capacity(entries.len());
        for (name, is_dir) in entries {
            let path = directory.join(&name);
            let id = self.resolver.logical_id(&path).unwrap_or_else(|| name.clone());
            if is_dir {
                let children = self.build_tree(&path)?;
                nodes.push(TreeNode::directory(id, name, children));
            } else {
                nodes.push(TreeNode::file(id, name));
            }
        }
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn builder(root: &Path) -> TreeBuilder {
        TreeBuilder::new(PathResolver::new(root).unwrap(), ".trash")
    }

    #[test]
    fn lists_entries_sorted_with_nested_children() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b_project/figures")).unwrap();
        fs::write(dir.path().join("b_project/main.tex"), "\\documentclass{article}").unwrap();
        fs::write(dir.path().join("b_project/figures/plot.pdf"), "%PDF").unwrap();
        fs::write(dir.path().join("a_notes.txt"), "hi").unwrap();

        let tree = builder(dir.path()).build().unwrap();
        let names: Vec<_> = tree.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, ["a_notes.txt", "b_project"]);

        let project = &tree[1];
        assert!(project.is_dir());
        assert_eq!(project.id, "b_project");
        let children = project.children.as_ref().unwrap();
        assert_eq!(children[0].id, "b_project/figures");
        assert_eq!(children[1].id, "b_project/main.tex");
        assert!(!children[1].is_dir());
        assert!(find_in(&tree, "b_project/figures/plot.pdf").is_some());
    }

    #[test]
    fn hides_dotfiles_but_keeps_trash() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();
        fs::create_dir_all(dir.path().join(".texdesk")).unwrap();
        fs::create_dir_all(dir.path().join(".trash")).unwrap();
        fs::write(dir.path().join(".trash/trash-info.json"), "{\"items\":[]}").unwrap();
        fs::create_dir_all(dir.path().join("paper/.git")).unwrap();

        let tree = builder(dir.path()).build().unwrap();
        let names: Vec<_> = tree.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, [".trash", "paper"]);
        assert!(find_in(&tree, ".trash/trash-info.json").is_some());
        assert_eq!(tree[1].children.as_deref(), Some(&[][..]));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_descended() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "x").unwrap();
        symlink(outside.path(), dir.path().join("elsewhere")).unwrap();
        fs::create_dir(dir.path().join("paper")).unwrap();
        symlink(dir.path(), dir.path().join("paper/loop")).unwrap();

        let tree = builder(dir.path()).build().unwrap();
        let elsewhere = find_in(&tree, "elsewhere").unwrap();
        assert_eq!(elsewhere.children, None);
        assert!(find_in(&tree, "elsewhere/secret.txt").is_none());
        let looped = find_in(&tree, "paper/loop").unwrap();
        assert_eq!(looped.children, None);
    }

    #[test]
    fn serialises_files_without_children_field() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/readme.txt"), "x").unwrap();

        let tree = builder(dir.path()).build().unwrap();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {
                    "id": "docs",
                    "name": "docs",
                    "children": [ { "id": "docs/readme.txt", "name": "readme.txt" } ]
                }
            ])
        );
    }

    #[test]
    fn unreadable_root_is_an_error() {
        let dir = tempdir().unwrap();
        let builder = builder(dir.path());
        let err = builder.build_tree(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, TreeError::Io { .. }));
    }
}
