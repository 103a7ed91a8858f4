//! Read-mostly project metadata resolved once, before the first `init` hook

pub mod dotenv;
pub mod tsconfig;

pub use dotenv::{ResolvedDotenv, load_dotenv};
pub use tsconfig::{ResolvedTsconfig, load_tsconfig};

use std::path::PathBuf;

use crate::config::ResolvedOptions;
use crate::error::{Error, Result};

pub const DEFAULT_ENTRY: &str = "src/index.ts";

/// Resolve entry points. Configured entries must exist; without any, `src/index.ts` is used when present.
pub fn resolve_entry(options: &ResolvedOptions) -> Result<Vec<PathBuf>> {
    if options.entry.is_empty() {
        let default = options.project_root.join(DEFAULT_ENTRY);
        return Ok(if default.is_file() { vec![default] } else { Vec::new() });
    }

    let missing: Vec<String> = options
        .entry
        .iter()
        .filter(|entry| !entry.is_file())
        .map(|entry| entry.display().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(Error::Config(format!(
            "Entry files not found: {}",
            missing.join(", ")
        )));
    }

    Ok(options.entry.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigMerger, StormConfig};
    use tempfile::TempDir;

    #[test]
    fn test_default_entry_only_when_present() {
        let temp_dir = TempDir::new().unwrap();
        let options = ConfigMerger::new(temp_dir.path()).resolve().unwrap();
        assert!(resolve_entry(&options).unwrap().is_empty());

        std::fs::create_dir_all(temp_dir.path().join("src")).unwrap();
        std::fs::write(temp_dir.path().join(DEFAULT_ENTRY), "").unwrap();
        assert_eq!(
            resolve_entry(&options).unwrap(),
            vec![temp_dir.path().join(DEFAULT_ENTRY)]
        );
    }

    #[test]
    fn test_missing_configured_entry_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let options = ConfigMerger::new(temp_dir.path())
            .with_file_config(StormConfig {
                entry: Some(vec![PathBuf::from("src/main.ts")]),
                ..Default::default()
            })
            .resolve()
            .unwrap();
        assert!(matches!(resolve_entry(&options), Err(Error::Config(_))));
    }
}
