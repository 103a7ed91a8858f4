//! Directory tree view over staged files, and the flush walk

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::VfsFile;

/// A node of the staged tree: directories hold more nodes, files hold content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VfsNode {
    Directory { name: String, contents: Vec<VfsNode> },
    File { name: String, contents: String },
}

impl VfsNode {
    pub fn name(&self) -> &str {
        match self {
            VfsNode::Directory { name, .. } | VfsNode::File { name, .. } => name,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, VfsNode::Directory { .. })
    }

    /// Number of files below (and including) this node
    pub fn file_count(&self) -> usize {
        match self {
            VfsNode::File { .. } => 1,
            VfsNode::Directory { contents, .. } => contents.iter().map(VfsNode::file_count).sum(),
        }
    }
}

/// Group files under `root` into a sorted tree
pub(super) fn build<'a>(root: &Path, files: impl Iterator<Item = &'a VfsFile>) -> Vec<VfsNode> {
    let mut nodes = Vec::new();
    for file in files {
        let Ok(relative) = file.path.strip_prefix(root) else {
            continue;
        };
        let components: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        insert(&mut nodes, &components, &file.contents);
    }
    nodes
}

fn insert(nodes: &mut Vec<VfsNode>, components: &[String], contents: &str) {
    let Some((first, rest)) = components.split_first() else {
        return;
    };

    if rest.is_empty() {
        nodes.push(VfsNode::File {
            name: first.clone(),
            contents: contents.to_string(),
        });
        return;
    }

    let position = nodes
        .iter()
        .position(|node| node.is_directory() && node.name() == first);
    let index = match position {
        Some(index) => index,
        None => {
            nodes.push(VfsNode::Directory {
                name: first.clone(),
                contents: Vec::new(),
            });
            nodes.len() - 1
        }
    };

    if let VfsNode::Directory { contents: children, .. } = &mut nodes[index] {
        insert(children, rest, contents);
    }
}

/// Write `node` below `dir`. Only directories are recursed into.
pub(super) fn flush_node(node: &VfsNode, dir: &Path, written: &mut Vec<PathBuf>) -> Result<()> {
    match node {
        VfsNode::Directory { name, contents } => {
            let path = dir.join(name);
            fs::create_dir_all(&path).map_err(|e| Error::io(&path, e))?;
            for child in contents {
                flush_node(child, &path, written)?;
            }
        }
        VfsNode::File { name, contents } => {
            let path = dir.join(name);
            fs::write(&path, contents).map_err(|e| Error::io(&path, e))?;
            written.push(path);
        }
    }
    Ok(())
}
