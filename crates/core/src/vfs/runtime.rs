//! Name-based resolution of `storm:*` runtime modules for bundler plugins

use std::collections::BTreeMap;

use super::{RUNTIME_PREFIX, VfsFile, VirtualFileSystem};

/// Alias chains longer than this are treated as cycles
const MAX_ALIAS_HOPS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedModule<'a> {
    /// Served from the VFS
    Virtual(&'a VfsFile),
    /// Aliased to a specifier the bundler resolves itself
    External(String),
}

/// Resolves import specifiers against aliases and the VFS runtime index
#[derive(Debug, Clone, Copy)]
pub struct RuntimeResolver<'a> {
    vfs: &'a VirtualFileSystem,
    alias: &'a BTreeMap<String, String>,
}

impl<'a> RuntimeResolver<'a> {
    pub fn new(vfs: &'a VirtualFileSystem, alias: &'a BTreeMap<String, String>) -> Self {
        Self { vfs, alias }
    }

    /// Resolve `specifier`, following aliases first.
    ///
    /// Returns `None` for specifiers this resolver does not own, and for
    /// `storm:*` ids nothing has generated.
    pub fn resolve(&self, specifier: &str) -> Option<ResolvedModule<'a>> {
        let mut current = specifier;
        for _ in 0..MAX_ALIAS_HOPS {
            match self.alias.get(current) {
                Some(target) => current = target,
                None => break,
            }
        }
        if self.alias.contains_key(current) {
            tracing::warn!("Alias cycle while resolving '{}'", specifier);
            return None;
        }

        if current.starts_with(RUNTIME_PREFIX) {
            return self.vfs.resolve_runtime(current).map(ResolvedModule::Virtual);
        }

        if current != specifier {
            return Some(ResolvedModule::External(current.to_string()));
        }
        None
    }

    /// Whether a specifier is a runtime id
    pub fn is_runtime_id(specifier: &str) -> bool {
        specifier.starts_with(RUNTIME_PREFIX)
    }
}
