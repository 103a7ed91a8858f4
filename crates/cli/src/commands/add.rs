use anyhow::{Context, Result, bail};
use std::path::Path;
use storm_core::config::{CONFIG_FILE_NAMES, PluginEntry};
use storm_core::plugins::{PluginRegistry, canonical_name};
use storm_core::StormConfig;

/// Append a plugin to the project's `storm.config.json`.
///
/// Returns `false` when the plugin was already configured.
pub fn add_plugin_command(root: &Path, name: &str, options: Option<&str>) -> Result<bool> {
    let registry = PluginRegistry::with_builtins();
    if !registry.contains(name) {
        bail!(
            "Unknown plugin '{name}'. Available plugins: {}",
            registry.names().join(", ")
        );
    }

    let config_path = match StormConfig::find_config_file(root) {
        Some(path) if path.extension().and_then(|e| e.to_str()) != Some("json") => {
            bail!(
                "{} is not JSON; add the plugin to it by hand",
                path.display()
            );
        }
        Some(path) => path,
        None => root.join(CONFIG_FILE_NAMES[0]),
    };

    let mut config = if config_path.exists() {
        StormConfig::load_from_file(&config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?
    } else {
        StormConfig::default()
    };

    let name = canonical_name(name).to_string();
    let entry = match options {
        Some(raw) => {
            let value: serde_json::Value = serde_json::from_str(raw)
                .with_context(|| format!("Plugin options for '{name}' are not valid JSON"))?;
            if !value.is_object() {
                bail!("Plugin options for '{name}' must be a JSON object");
            }
            PluginEntry::WithOptions(name.clone(), value)
        }
        None => PluginEntry::Name(name.clone()),
    };

    if !config.add_plugin(entry) {
        println!("ℹ️  Plugin '{name}' is already configured in {}", config_path.display());
        return Ok(false);
    }

    config
        .save_to_file(&config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("✅ Added plugin '{name}' to {}", config_path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_creates_config_and_skips_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        assert!(add_plugin_command(temp_dir.path(), "log", None).unwrap());
        assert!(!add_plugin_command(temp_dir.path(), "@storm-stack/plugin-log", None).unwrap());
        assert!(add_plugin_command(temp_dir.path(), "error", Some(r#"{"defaultType":"api"}"#)).unwrap());

        let config = StormConfig::load_from_root(temp_dir.path()).unwrap();
        let plugins = config.plugins.unwrap();
        assert_eq!(plugins.len(), 2);
        assert_eq!(plugins[1].options()["defaultType"], "api");
    }

    #[test]
    fn test_add_rejects_unknown_plugin_and_bad_options() {
        let temp_dir = TempDir::new().unwrap();
        assert!(add_plugin_command(temp_dir.path(), "sentry", None).is_err());
        assert!(add_plugin_command(temp_dir.path(), "log", Some("[1]")).is_err());
        assert!(!temp_dir.path().join("storm.config.json").exists());
    }

    #[test]
    fn test_add_refuses_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("storm.config.toml"), "name = \"x\"\n").unwrap();
        assert!(add_plugin_command(temp_dir.path(), "log", None).is_err());
    }
}
