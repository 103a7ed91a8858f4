//! Virtual file system for generated content
//!
//! Plugins stage generated files here during a run. Nothing touches disk
//! until the engine flushes the VFS at `finalize`. Files flagged with a
//! runtime id (`storm:log`, `storm:error`, ...) are also resolvable by name
//! through [`RuntimeResolver`].

pub mod runtime;
pub mod tree;

pub use runtime::{ResolvedModule, RuntimeResolver};
pub use tree::VfsNode;

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::utils::fs::normalize_path;

/// Directory names a build never writes into
const PROTECTED_DIRS: [&str; 2] = [".git", "node_modules"];

/// Prefix of importable runtime module ids
pub const RUNTIME_PREFIX: &str = "storm:";

/// A staged file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsFile {
    /// Absolute, normalized path
    pub path: PathBuf,
    pub contents: String,
    /// Set for runtime modules importable by name
    pub runtime_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub runtime_id: Option<String>,
}

impl WriteOptions {
    /// Options for a runtime module such as `storm:error`
    pub fn runtime(id: impl Into<String>) -> Self {
        Self {
            runtime_id: Some(id.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VirtualFileSystem {
    root: PathBuf,
    files: BTreeMap<PathBuf, VfsFile>,
    runtime_index: BTreeMap<String, PathBuf>,
}

impl VirtualFileSystem {
    /// Create an empty VFS owning everything below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
            runtime_index: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stage `contents` at `path`. A later write to the same path replaces the earlier one.
    ///
    /// Relative paths are resolved against the VFS root. Returns the normalized path.
    pub fn write_file(
        &mut self,
        path: impl AsRef<Path>,
        contents: impl Into<String>,
        options: WriteOptions,
    ) -> Result<PathBuf> {
        let path = self.resolve_owned(path.as_ref())?;
        self.check_no_file_dir_clash(&path)?;

        if let Some(ref id) = options.runtime_id {
            if !id.starts_with(RUNTIME_PREFIX) {
                return Err(Error::Config(format!(
                    "Runtime module id '{id}' must start with '{RUNTIME_PREFIX}'"
                )));
            }
            if let Some(existing) = self.runtime_index.get(id) {
                if existing != &path {
                    return Err(Error::Config(format!(
                        "Runtime module '{id}' is already provided by {}",
                        existing.display()
                    )));
                }
            }
        }

        let file = VfsFile {
            path: path.clone(),
            contents: contents.into(),
            runtime_id: options.runtime_id,
        };

        if let Some(previous) = self.files.insert(path.clone(), file) {
            trace!("Overwriting staged file {}", path.display());
            if let Some(old_id) = previous.runtime_id {
                self.runtime_index.remove(&old_id);
            }
        }
        if let Some(id) = self.files[&path].runtime_id.clone() {
            self.runtime_index.insert(id, path.clone());
        }

        debug!("Staged {}", path.display());
        Ok(path)
    }

    pub fn read_file(&self, path: impl AsRef<Path>) -> Option<&str> {
        let path = normalize_path(&self.root, path.as_ref());
        self.files.get(&path).map(|f| f.contents.as_str())
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.files.contains_key(&normalize_path(&self.root, path.as_ref()))
    }

    /// Drop a staged file, returning it if it existed
    pub fn remove(&mut self, path: impl AsRef<Path>) -> Option<VfsFile> {
        let path = normalize_path(&self.root, path.as_ref());
        let removed = self.files.remove(&path)?;
        if let Some(ref id) = removed.runtime_id {
            self.runtime_index.remove(id);
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.runtime_index.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Staged paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn files(&self) -> impl Iterator<Item = &VfsFile> {
        self.files.values()
    }

    /// Staged files flagged as runtime modules, sorted by path
    pub fn get_runtime(&self) -> Vec<&VfsFile> {
        self.files
            .values()
            .filter(|file| file.runtime_id.is_some())
            .collect()
    }

    /// Look up a runtime module by id, e.g. `storm:error`
    pub fn resolve_runtime(&self, id: &str) -> Option<&VfsFile> {
        self.runtime_index.get(id).and_then(|path| self.files.get(path))
    }

    /// Build the directory tree of staged files, relative to the root
    pub fn tree(&self) -> Vec<VfsNode> {
        tree::build(&self.root, self.files.values())
    }

    /// Write every staged file below `target_root`, creating directories as needed.
    ///
    /// Returns the written paths.
    pub fn flush(&self, target_root: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.files.len());
        for node in self.tree() {
            tree::flush_node(&node, target_root, &mut written)?;
        }
        debug!("Flushed {} files to {}", written.len(), target_root.display());
        Ok(written)
    }

    /// Normalize `path` and check the build may write there
    fn resolve_owned(&self, path: &Path) -> Result<PathBuf> {
        let normalized = normalize_path(&self.root, path);

        let relative = normalized.strip_prefix(&self.root).map_err(|_| Error::InvalidPath {
            path: normalized.clone(),
            reason: format!("outside of the project root {}", self.root.display()),
        })?;

        if relative.as_os_str().is_empty() {
            return Err(Error::InvalidPath {
                path: normalized,
                reason: "the project root itself is not a file".to_string(),
            });
        }

        let protected = relative.components().any(|component| match component {
            Component::Normal(name) => PROTECTED_DIRS.iter().any(|dir| name == *dir),
            _ => false,
        });
        if protected {
            return Err(Error::InvalidPath {
                path: normalized,
                reason: format!("not owned by the build ({})", PROTECTED_DIRS.join(", ")),
            });
        }

        Ok(normalized)
    }

    /// A path cannot be both a file and the directory of another staged file
    fn check_no_file_dir_clash(&self, path: &Path) -> Result<()> {
        if let Some(ancestor) = path
            .ancestors()
            .skip(1)
            .take_while(|a| a.starts_with(&self.root))
            .find(|a| self.files.contains_key(*a))
        {
            return Err(Error::InvalidPath {
                path: path.to_path_buf(),
                reason: format!("{} is already staged as a file", ancestor.display()),
            });
        }

        let has_children = self
            .files
            .range(path.to_path_buf()..)
            .map(|(p, _)| p)
            .take_while(|p| p.starts_with(path))
            .any(|p| p != path);
        if has_children {
            return Err(Error::InvalidPath {
                path: path.to_path_buf(),
                reason: "already staged as a directory".to_string(),
            });
        }
        Ok(())
    }
}
