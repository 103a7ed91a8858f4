//! Shared state threaded through every hook of one engine run

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::ResolvedOptions;
use crate::error::{Error, Result};
use crate::reflection::SerializedType;
use crate::resolve::{self, ResolvedDotenv, ResolvedTsconfig};
use crate::vfs::{RUNTIME_PREFIX, RuntimeResolver, VirtualFileSystem, WriteOptions};

/// A runtime module preset other generated files import from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeImport {
    pub module: String,
    pub imports: Vec<String>,
}

/// A package a plugin needs in the generated project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInstall {
    pub name: String,
    pub dev: bool,
    pub requested_by: String,
}

/// Escape hatch that later plugins append to; last writer wins per key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub alias: BTreeMap<String, String>,
}

/// The mutable record every hook receives.
///
/// Options and resolved paths are fixed at construction. Everything else is
/// shared state plugins read and write in phase order.
#[derive(Debug)]
pub struct Context {
    options: Arc<ResolvedOptions>,
    pub vfs: VirtualFileSystem,
    pub resolved_entry: Vec<PathBuf>,
    pub resolved_tsconfig: Option<ResolvedTsconfig>,
    pub resolved_dotenv: ResolvedDotenv,
    pub overrides: Overrides,
    /// Reflections shared between plugins, keyed by kind (`vars`, `config`, ...)
    pub reflections: BTreeMap<String, SerializedType>,
    pub runtime_imports: Vec<RuntimeImport>,
    pub installs: Vec<PackageInstall>,
}

impl Context {
    /// Build a context, resolving entry, tsconfig and dotenv metadata
    pub fn resolve(options: ResolvedOptions) -> Result<Self> {
        let mut context = Self::new(options);
        context.resolve_metadata()?;
        Ok(context)
    }

    /// (Re)read entry points, tsconfig and `.env` files from disk
    pub fn resolve_metadata(&mut self) -> Result<()> {
        let options = &self.options;
        self.resolved_entry = resolve::resolve_entry(options)?;
        self.resolved_tsconfig = resolve::load_tsconfig(&options.tsconfig)?;
        self.resolved_dotenv = resolve::load_dotenv(&options.dotenv_files)?;

        debug!(
            "Resolved context for '{}': {} entries, tsconfig: {}, {} dotenv values",
            options.name,
            self.resolved_entry.len(),
            self.resolved_tsconfig.is_some(),
            self.resolved_dotenv.values.len()
        );
        Ok(())
    }

    /// Build a context without touching the filesystem
    pub fn new(options: ResolvedOptions) -> Self {
        let overrides = Overrides {
            alias: options.alias.clone(),
        };
        Self {
            vfs: VirtualFileSystem::new(&options.project_root),
            options: Arc::new(options),
            resolved_entry: Vec::new(),
            resolved_tsconfig: None,
            resolved_dotenv: ResolvedDotenv::default(),
            overrides,
            reflections: BTreeMap::new(),
            runtime_imports: Vec::new(),
            installs: Vec::new(),
        }
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    /// Shared handle to the frozen options, for hooks that outlive a borrow
    pub fn options_arc(&self) -> Arc<ResolvedOptions> {
        Arc::clone(&self.options)
    }

    pub fn workspace_root(&self) -> &Path {
        &self.options.workspace_root
    }

    pub fn project_root(&self) -> &Path {
        &self.options.project_root
    }

    pub fn runtime_dir(&self) -> &Path {
        &self.options.runtime_dir
    }

    pub fn types_dir(&self) -> &Path {
        &self.options.types_dir
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.options.artifacts_dir
    }

    /// File path of a runtime module: `storm:log` -> `<runtime_dir>/log.ts`
    pub fn runtime_path(&self, id: &str) -> Result<PathBuf> {
        let name = id
            .strip_prefix(RUNTIME_PREFIX)
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\', '.']))
            .ok_or_else(|| Error::Config(format!("Invalid runtime module id '{id}'")))?;
        Ok(self.runtime_dir().join(format!("{name}.ts")))
    }

    /// Stage a runtime module under its id
    pub fn write_runtime(&mut self, id: &str, contents: impl Into<String>) -> Result<PathBuf> {
        let path = self.runtime_path(id)?;
        self.vfs.write_file(path, contents, WriteOptions::runtime(id))
    }

    /// Stage a declaration file in the types directory
    pub fn write_types(&mut self, file_name: &str, contents: impl Into<String>) -> Result<PathBuf> {
        let path = self.types_dir().join(file_name);
        self.vfs.write_file(path, contents, WriteOptions::default())
    }

    /// Set a module alias, returning the value it replaced
    pub fn set_alias(&mut self, from: impl Into<String>, to: impl Into<String>) -> Option<String> {
        self.overrides.alias.insert(from.into(), to.into())
    }

    /// Register named imports from a runtime module; repeated names are kept once
    pub fn add_runtime_import(&mut self, module: &str, imports: &[&str]) {
        let index = match self.runtime_imports.iter().position(|i| i.module == module) {
            Some(index) => index,
            None => {
                self.runtime_imports.push(RuntimeImport {
                    module: module.to_string(),
                    imports: Vec::new(),
                });
                self.runtime_imports.len() - 1
            }
        };
        let entry = &mut self.runtime_imports[index];
        for name in imports {
            if !entry.imports.iter().any(|existing| existing == name) {
                entry.imports.push(name.to_string());
            }
        }
    }

    /// Record a package a plugin depends on; duplicates are ignored
    pub fn request_install(&mut self, name: &str, dev: bool, requested_by: &str) {
        if self.installs.iter().any(|i| i.name == name) {
            return;
        }
        self.installs.push(PackageInstall {
            name: name.to_string(),
            dev,
            requested_by: requested_by.to_string(),
        });
    }

    /// Resolver for `storm:*` imports over the current VFS and aliases
    pub fn resolver(&self) -> RuntimeResolver<'_> {
        RuntimeResolver::new(&self.vfs, &self.overrides.alias)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::context;
    use super::*;

    #[test]
    fn test_runtime_path() {
        let ctx = context();
        assert_eq!(
            ctx.runtime_path("storm:error").unwrap(),
            PathBuf::from("/project/.storm/runtime/error.ts")
        );
        for bad in ["error", "storm:", "storm:../x", "storm:a/b"] {
            assert!(ctx.runtime_path(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_write_runtime_is_resolvable() {
        let mut ctx = context();
        ctx.write_runtime("storm:log", "export {}").unwrap();

        assert!(ctx.vfs.exists(".storm/runtime/log.ts"));
        assert!(ctx.resolver().resolve("storm:log").is_some());
    }

    #[test]
    fn test_alias_last_writer_wins() {
        let mut ctx = context();
        assert_eq!(ctx.set_alias("storm:http", "./a"), None);
        assert_eq!(ctx.set_alias("storm:http", "./b"), Some("./a".to_string()));
        assert_eq!(ctx.overrides.alias["storm:http"], "./b");
    }

    #[test]
    fn test_runtime_imports_deduplicate() {
        let mut ctx = context();
        ctx.add_runtime_import("storm:log", &["StormLog"]);
        ctx.add_runtime_import("storm:log", &["StormLog", "LogLevel"]);
        ctx.add_runtime_import("storm:error", &["StormError"]);

        assert_eq!(ctx.runtime_imports.len(), 2);
        assert_eq!(ctx.runtime_imports[0].imports, vec!["StormLog", "LogLevel"]);
    }

    #[test]
    fn test_request_install_once() {
        let mut ctx = context();
        ctx.request_install("@storm-stack/log", false, "log");
        ctx.request_install("@storm-stack/log", true, "error");
        assert_eq!(ctx.installs.len(), 1);
        assert_eq!(ctx.installs[0].requested_by, "log");
    }
}
