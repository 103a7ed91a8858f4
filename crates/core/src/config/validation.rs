//! Validation of resolved options before an engine run starts

use crate::{
    config::ResolvedOptions,
    error::{Error, Result},
};
use regex::Regex;
use std::path::Path;

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Reject option combinations the engine cannot run with
pub fn validate_options(options: &ResolvedOptions) -> Result<()> {
    validate_name(&options.name)?;

    if !LOG_LEVELS.contains(&options.log_level.to_lowercase().as_str()) {
        return Err(Error::Config(format!(
            "Invalid logLevel '{}', expected one of: {}",
            options.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    for (label, dir) in [
        ("runtimeDir", &options.runtime_dir),
        ("typesDir", &options.types_dir),
        ("artifactsDir", &options.artifacts_dir),
    ] {
        ensure_within(label, dir, &options.project_root)?;
    }

    for plugin in &options.plugins {
        if plugin.name().trim().is_empty() {
            return Err(Error::Config("Plugin entries must have a non-empty name".to_string()));
        }
    }

    for error_type in options.error_messages.keys() {
        if error_type.trim().is_empty() {
            return Err(Error::Config(
                "errors.messages keys must be non-empty error types".to_string(),
            ));
        }
    }

    Ok(())
}

/// Project names follow package naming: optional `@scope/`, then `[a-z0-9._-]`
fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Config("Project name must not be empty".to_string()));
    }

    let pattern = Regex::new(r"^(@[A-Za-z0-9._-]+/)?[A-Za-z0-9._-]+$")
        .map_err(|e| Error::Config(format!("Invalid name pattern: {e}")))?;
    if !pattern.is_match(name) {
        return Err(Error::Config(format!("Invalid project name '{name}'")));
    }
    Ok(())
}

fn ensure_within(label: &str, dir: &Path, project_root: &Path) -> Result<()> {
    if !dir.starts_with(project_root) {
        return Err(Error::Config(format!(
            "{label} ({}) must be inside the project root ({})",
            dir.display(),
            project_root.display()
        )));
    }
    Ok(())
}
