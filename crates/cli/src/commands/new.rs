use anyhow::{Context, Result, bail};
use regex::Regex;
use std::{fs, path::{Path, PathBuf}};
use storm_core::config::merge::{DEFAULT_RUNTIME_DIR, DEFAULT_TYPES_DIR};
use storm_core::config::{CONFIG_FILE_NAMES, PluginEntry};
use storm_core::{ProjectType, StormConfig};
use tracing::info;

use crate::templates;

/// Scaffold `<parent>/<dir>` where `dir` is the unscoped part of `name`
pub fn new_command(parent: &Path, project_type: ProjectType, name: &str, force: bool) -> Result<PathBuf> {
    let pattern = Regex::new(r"^(@[a-z0-9._-]+/)?[a-z0-9][a-z0-9._-]*$")?;
    if !pattern.is_match(name) {
        bail!("Invalid project name '{name}': use lowercase letters, digits, '.', '_' or '-', optionally scoped as @scope/name");
    }
    let dir_name = name.rsplit('/').next().unwrap_or(name);
    let project_dir = parent.join(dir_name);

    let existing = CONFIG_FILE_NAMES
        .iter()
        .map(|file| project_dir.join(file))
        .find(|path| path.exists());
    if let Some(existing) = existing {
        if !force {
            bail!(
                "A Storm project already exists at {} (use --force to overwrite)",
                existing.display()
            );
        }
        println!("⚠️  Overwriting project at {}", project_dir.display());
    }

    println!("🚀 Creating {} {} in {}", project_type, name, project_dir.display());
    fs::create_dir_all(project_dir.join("src"))
        .with_context(|| format!("Failed to create {}", project_dir.display()))?;

    let mut plugins = vec![
        PluginEntry::Name("log".to_string()),
        PluginEntry::Name("error".to_string()),
    ];
    if project_type == ProjectType::Application {
        plugins.push(PluginEntry::Name("dotenv".to_string()));
    }
    let config = StormConfig {
        name: Some(name.to_string()),
        project_type: Some(project_type),
        plugins: Some(plugins),
        ..Default::default()
    };

    let config_path = project_dir.join(CONFIG_FILE_NAMES[0]);
    config
        .save_to_file(&config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let mut files = vec![
        ("src/index.ts", templates::index_ts(project_type, name)),
        ("tsconfig.json", templates::tsconfig_json(DEFAULT_RUNTIME_DIR, DEFAULT_TYPES_DIR)),
    ];
    if project_type == ProjectType::Application {
        files.push((".env", templates::dotenv(dir_name)));
    }
    for (relative, contents) in files {
        let path = project_dir.join(relative);
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Created {}", path.display());
    }

    println!("✅ Created {}", config_path.display());
    println!("\n📌 Next steps:");
    println!("   cd {dir_name}");
    println!("   storm build");
    Ok(project_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scaffold_library() {
        let temp_dir = TempDir::new().unwrap();
        let dir = new_command(temp_dir.path(), ProjectType::Library, "@acme/utils", false).unwrap();

        assert_eq!(dir, temp_dir.path().join("utils"));
        let config = StormConfig::load_from_file(&dir.join("storm.config.json")).unwrap();
        assert_eq!(config.name.as_deref(), Some("@acme/utils"));
        assert_eq!(config.project_type, Some(ProjectType::Library));
        assert!(dir.join("src/index.ts").exists());
        assert!(!dir.join(".env").exists());
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        new_command(temp_dir.path(), ProjectType::Application, "api", false).unwrap();
        assert!(new_command(temp_dir.path(), ProjectType::Application, "api", false).is_err());
        assert!(new_command(temp_dir.path(), ProjectType::Application, "api", true).is_ok());
    }

    #[test]
    fn test_rejects_invalid_names() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["Bad Name", "../escape", "@scope/", ""] {
            assert!(new_command(temp_dir.path(), ProjectType::Library, name, false).is_err(), "{name}");
        }
    }
}
