use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{Mode, OutputMode, ProjectType};

/// File names searched for in a project root, in priority order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["storm.config.json", "storm.config.toml"];

/// One layer of Storm configuration, as written in `storm.config.json`.
///
/// Every field is optional so layers (defaults, file, environment, CLI) can be
/// stacked by [`super::ConfigMerger`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StormConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_type: Option<ProjectType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsconfig: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dotenv: Option<DotenvConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<PluginEntry>>,
    #[serde(rename = "override", skip_serializing_if = "Option::is_none")]
    pub overrides: Option<OverrideConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_mode: Option<OutputMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DotenvConfig {
    /// `.env` files to load, later files win; missing files are skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<PathBuf>>,
    /// Name of the generated variables type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<String>,
    /// Variable names persisted to the secrets store instead of the values store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codes_file: Option<PathBuf>,
    /// Messages registered in the code table during `build:pre`, keyed by error type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideConfig {
    /// Module aliases; later layers win per key
    #[serde(default)]
    pub alias: BTreeMap<String, String>,
}

/// A configured plugin: either `"name"` or `["name", { ...options }]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginEntry {
    Name(String),
    WithOptions(String, serde_json::Value),
}

impl PluginEntry {
    pub fn name(&self) -> &str {
        match self {
            PluginEntry::Name(name) | PluginEntry::WithOptions(name, _) => name,
        }
    }

    /// Plugin options, `null` when none were given
    pub fn options(&self) -> serde_json::Value {
        match self {
            PluginEntry::Name(_) => serde_json::Value::Null,
            PluginEntry::WithOptions(_, options) => options.clone(),
        }
    }
}

impl StormConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");

        let config = if is_toml {
            toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))?
        } else {
            serde_json::from_str(&contents)
                .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))?
        };
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = crate::utils::fs::to_formatted_json(self)?;
        std::fs::write(path, contents).map_err(|e| Error::io(path, e))?;
        Ok(())
    }

    /// Locate the config file in `project_root`, JSON before TOML
    pub fn find_config_file(project_root: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| project_root.join(name))
            .find(|path| path.exists())
    }

    /// Load the project's config file, or an empty layer when there is none
    pub fn load_from_root(project_root: &Path) -> Result<Self> {
        match Self::find_config_file(project_root) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                tracing::debug!("No config file in {}, using defaults", project_root.display());
                Ok(Self::default())
            }
        }
    }

    /// Append a plugin unless one with the same name is configured already.
    ///
    /// Returns `false` when the plugin was already present.
    pub fn add_plugin(&mut self, entry: PluginEntry) -> bool {
        let plugins = self.plugins.get_or_insert_with(Vec::new);
        if plugins.iter().any(|p| p.name() == entry.name()) {
            return false;
        }
        plugins.push(entry);
        true
    }
}
