//! Configuration merging for Storm projects
//!
//! Layers are applied in order: built-in defaults -> config file ->
//! environment -> CLI overrides. Scalar fields are replaced by later layers,
//! nested sections merge field by field, and aliases merge per key.
//! The result is frozen into [`ResolvedOptions`].

use super::{
    DotenvConfig, ErrorsConfig, Mode, OutputConfig, OutputMode, OverrideConfig, PluginEntry,
    ProjectType, StormConfig,
};
use crate::error::Result;
use crate::utils::fs::normalize_path;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_ARTIFACTS_DIR: &str = ".storm";
pub const DEFAULT_RUNTIME_DIR: &str = ".storm/runtime";
pub const DEFAULT_TYPES_DIR: &str = ".storm/types";
pub const DEFAULT_OUTPUT_PATH: &str = "dist";
pub const DEFAULT_TSCONFIG: &str = "tsconfig.json";
pub const DEFAULT_VARS_TYPE: &str = "StormVariables";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Settings read from the process environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvLayer {
    pub workspace_root: Option<PathBuf>,
    pub mode: Option<Mode>,
}

impl EnvLayer {
    /// Read `STORM_WORKSPACE_ROOT` / `NX_WORKSPACE_ROOT_PATH` and `STORM_ENV` / `NODE_ENV`
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build the layer from an explicit set of variables
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let vars: BTreeMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();

        let lookup = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| vars.get(*key))
                .find(|value| !value.trim().is_empty())
                .cloned()
        };

        let workspace_root = lookup(&["STORM_WORKSPACE_ROOT", "NX_WORKSPACE_ROOT_PATH"]).map(PathBuf::from);
        let mode = lookup(&["STORM_ENV", "NODE_ENV"]).and_then(|value| match value.parse::<Mode>() {
            Ok(mode) => Some(mode),
            Err(e) => {
                warn!("Ignoring environment mode: {}", e);
                None
            }
        });

        Self {
            workspace_root,
            mode,
        }
    }
}

/// Fully merged, immutable options for one engine run.
///
/// All directory fields are absolute and lexically normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub name: String,
    pub project_type: ProjectType,
    pub mode: Mode,
    pub log_level: String,
    pub workspace_root: PathBuf,
    pub project_root: PathBuf,
    pub entry: Vec<PathBuf>,
    pub tsconfig: PathBuf,
    pub runtime_dir: PathBuf,
    pub types_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub output_mode: OutputMode,
    pub output_path: PathBuf,
    pub dotenv_files: Vec<PathBuf>,
    pub vars_type_name: String,
    pub secrets: BTreeSet<String>,
    pub error_codes_file: PathBuf,
    pub error_messages: BTreeMap<String, Vec<String>>,
    pub plugins: Vec<PluginEntry>,
    pub alias: BTreeMap<String, String>,
}

impl ResolvedOptions {
    pub fn is_production(&self) -> bool {
        self.mode == Mode::Production
    }

    /// Directory holding persisted reflection files
    pub fn reflections_dir(&self) -> PathBuf {
        self.artifacts_dir.join("reflections")
    }
}

pub struct ConfigMerger {
    project_root: PathBuf,
    file_config: Option<StormConfig>,
    env: EnvLayer,
    overrides: Option<StormConfig>,
}

impl ConfigMerger {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            file_config: None,
            env: EnvLayer::default(),
            overrides: None,
        }
    }

    /// Load the config file found in the project root
    pub fn load_file(mut self) -> Result<Self> {
        self.file_config = Some(StormConfig::load_from_root(&self.project_root)?);
        Ok(self)
    }

    pub fn with_file_config(mut self, config: StormConfig) -> Self {
        self.file_config = Some(config);
        self
    }

    pub fn with_env(mut self, env: EnvLayer) -> Self {
        self.env = env;
        self
    }

    pub fn with_overrides(mut self, overrides: StormConfig) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Get the merged configuration layer (before path resolution)
    pub fn get_merged_config(&self) -> StormConfig {
        let mut config = StormConfig::default();

        if let Some(ref file) = self.file_config {
            config = merge_configs(config, file.clone());
        }

        let env_layer = StormConfig {
            mode: self.env.mode,
            ..Default::default()
        };
        config = merge_configs(config, env_layer);

        if let Some(ref overrides) = self.overrides {
            config = merge_configs(config, overrides.clone());
        }

        config
    }

    /// Merge every layer, apply defaults and resolve paths
    pub fn resolve(&self) -> Result<ResolvedOptions> {
        let config = self.get_merged_config();
        let project_root = normalize_path(&current_dir_or_root(), &self.project_root);
        let workspace_root = self
            .env
            .workspace_root
            .as_ref()
            .map(|root| normalize_path(&project_root, root))
            .unwrap_or_else(|| project_root.clone());

        let resolve_dir = |value: &Option<PathBuf>, default: &str| {
            normalize_path(
                &project_root,
                value.as_deref().unwrap_or_else(|| Path::new(default)),
            )
        };

        let name = config.name.clone().unwrap_or_else(|| {
            project_root
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("storm-project")
                .to_string()
        });
        let mode = config.mode.unwrap_or_default();

        let artifacts_dir = resolve_dir(&config.artifacts_dir, DEFAULT_ARTIFACTS_DIR);
        let output = config.output.clone().unwrap_or_default();
        let dotenv = config.dotenv.clone().unwrap_or_default();
        let errors = config.errors.clone().unwrap_or_default();

        let dotenv_files = dotenv.files.unwrap_or_else(|| {
            vec![
                PathBuf::from(".env"),
                PathBuf::from(".env.local"),
                PathBuf::from(format!(".env.{mode}")),
            ]
        });

        let error_codes_file = errors
            .codes_file
            .map(|path| normalize_path(&project_root, &path))
            .unwrap_or_else(|| artifacts_dir.join("errors").join("codes.json"));

        let options = ResolvedOptions {
            name,
            project_type: config.project_type.unwrap_or_default(),
            mode,
            log_level: config
                .log_level
                .as_deref()
                .map(|level| level.trim().to_lowercase())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            entry: config
                .entry
                .clone()
                .unwrap_or_default()
                .iter()
                .map(|entry| normalize_path(&project_root, entry))
                .collect(),
            tsconfig: resolve_dir(&config.tsconfig, DEFAULT_TSCONFIG),
            runtime_dir: resolve_dir(&config.runtime_dir, DEFAULT_RUNTIME_DIR),
            types_dir: resolve_dir(&config.types_dir, DEFAULT_TYPES_DIR),
            artifacts_dir,
            output_mode: output.output_mode.unwrap_or_default(),
            output_path: resolve_dir(&output.output_path, DEFAULT_OUTPUT_PATH),
            dotenv_files: dotenv_files
                .iter()
                .map(|file| normalize_path(&project_root, file))
                .collect(),
            vars_type_name: dotenv.types.unwrap_or_else(|| DEFAULT_VARS_TYPE.to_string()),
            secrets: dotenv.secrets.unwrap_or_default().into_iter().collect(),
            error_codes_file,
            error_messages: errors.messages.unwrap_or_default(),
            plugins: config.plugins.clone().unwrap_or_default(),
            alias: config.overrides.clone().map(|o| o.alias).unwrap_or_default(),
            workspace_root,
            project_root,
        };

        debug!(
            "Resolved options for '{}' ({} mode, {} plugins)",
            options.name,
            options.mode,
            options.plugins.len()
        );
        Ok(options)
    }
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self::new(current_dir_or_root())
    }
}

fn current_dir_or_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))
}

/// Merge `override_config` onto `base`; values present in the override win
fn merge_configs(mut base: StormConfig, override_config: StormConfig) -> StormConfig {
    macro_rules! replace {
        ($($field:ident),+) => {
            $(
                if override_config.$field.is_some() {
                    base.$field = override_config.$field;
                }
            )+
        };
    }

    replace!(
        name,
        project_type,
        mode,
        log_level,
        entry,
        tsconfig,
        runtime_dir,
        types_dir,
        artifacts_dir,
        plugins
    );

    base.output = merge_section(base.output, override_config.output, merge_output);
    base.dotenv = merge_section(base.dotenv, override_config.dotenv, merge_dotenv);
    base.errors = merge_section(base.errors, override_config.errors, merge_errors);
    base.overrides = merge_section(base.overrides, override_config.overrides, |mut base, over| {
        base.alias.extend(over.alias);
        base
    });

    base
}

fn merge_section<T>(base: Option<T>, over: Option<T>, merge: impl FnOnce(T, T) -> T) -> Option<T> {
    match (base, over) {
        (Some(base), Some(over)) => Some(merge(base, over)),
        (base, None) => base,
        (None, over) => over,
    }
}

fn merge_output(mut base: OutputConfig, over: OutputConfig) -> OutputConfig {
    if over.output_mode.is_some() {
        base.output_mode = over.output_mode;
    }
    if over.output_path.is_some() {
        base.output_path = over.output_path;
    }
    base
}

fn merge_dotenv(mut base: DotenvConfig, over: DotenvConfig) -> DotenvConfig {
    if over.files.is_some() {
        base.files = over.files;
    }
    if over.types.is_some() {
        base.types = over.types;
    }
    if over.secrets.is_some() {
        base.secrets = over.secrets;
    }
    base
}

fn merge_errors(mut base: ErrorsConfig, over: ErrorsConfig) -> ErrorsConfig {
    if over.codes_file.is_some() {
        base.codes_file = over.codes_file;
    }
    if let Some(messages) = over.messages {
        base.messages.get_or_insert_with(BTreeMap::new).extend(messages);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_layer() -> StormConfig {
        serde_json::from_value(serde_json::json!({
            "name": "file-app",
            "mode": "development",
            "output": { "outputMode": "virtual", "outputPath": "build" },
            "dotenv": { "types": "FileVars" },
            "override": { "alias": { "a": "file-a", "b": "file-b" } }
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let options = ConfigMerger::new("/work/my-lib").resolve().unwrap();

        assert_eq!(options.name, "my-lib");
        assert_eq!(options.project_type, ProjectType::Library);
        assert_eq!(options.mode, Mode::Production);
        assert_eq!(options.output_mode, OutputMode::Fs);
        assert_eq!(options.runtime_dir, PathBuf::from("/work/my-lib/.storm/runtime"));
        assert_eq!(options.types_dir, PathBuf::from("/work/my-lib/.storm/types"));
        assert_eq!(
            options.error_codes_file,
            PathBuf::from("/work/my-lib/.storm/errors/codes.json")
        );
        assert_eq!(options.workspace_root, options.project_root);
        assert_eq!(
            options.dotenv_files.last().unwrap(),
            &PathBuf::from("/work/my-lib/.env.production")
        );
    }

    #[test]
    fn test_layer_priority() {
        let overrides = StormConfig {
            mode: Some(Mode::Test),
            output: Some(OutputConfig {
                output_mode: Some(OutputMode::Fs),
                output_path: None,
            }),
            overrides: Some(OverrideConfig {
                alias: BTreeMap::from([("b".to_string(), "cli-b".to_string())]),
            }),
            ..Default::default()
        };

        let options = ConfigMerger::new("/work/app")
            .with_file_config(file_layer())
            .with_env(EnvLayer {
                workspace_root: Some(PathBuf::from("/work")),
                mode: Some(Mode::Production),
            })
            .with_overrides(overrides)
            .resolve()
            .unwrap();

        assert_eq!(options.name, "file-app");
        // CLI beats env beats file
        assert_eq!(options.mode, Mode::Test);
        // Nested sections merge field by field
        assert_eq!(options.output_mode, OutputMode::Fs);
        assert_eq!(options.output_path, PathBuf::from("/work/app/build"));
        assert_eq!(options.vars_type_name, "FileVars");
        assert_eq!(options.alias["a"], "file-a");
        assert_eq!(options.alias["b"], "cli-b");
        assert_eq!(options.workspace_root, PathBuf::from("/work"));
    }

    #[test]
    fn test_env_layer_from_vars() {
        let env = EnvLayer::from_vars([
            ("NX_WORKSPACE_ROOT_PATH", "/nx/root"),
            ("NODE_ENV", "development"),
        ]);
        assert_eq!(env.workspace_root, Some(PathBuf::from("/nx/root")));
        assert_eq!(env.mode, Some(Mode::Development));

        let env = EnvLayer::from_vars([
            ("STORM_WORKSPACE_ROOT", "/storm/root"),
            ("NX_WORKSPACE_ROOT_PATH", "/nx/root"),
            ("STORM_ENV", "test"),
            ("NODE_ENV", "production"),
        ]);
        assert_eq!(env.workspace_root, Some(PathBuf::from("/storm/root")));
        assert_eq!(env.mode, Some(Mode::Test));

        let env = EnvLayer::from_vars([("NODE_ENV", "staging")]);
        assert_eq!(env.mode, None);
    }

    #[test]
    fn test_plugins_replace_rather_than_append() {
        let file = StormConfig {
            plugins: Some(vec![PluginEntry::Name("log".into())]),
            ..Default::default()
        };
        let overrides = StormConfig {
            plugins: Some(vec![PluginEntry::Name("error".into())]),
            ..Default::default()
        };
        let options = ConfigMerger::new("/p")
            .with_file_config(file)
            .with_overrides(overrides)
            .resolve()
            .unwrap();
        assert_eq!(options.plugins, vec![PluginEntry::Name("error".into())]);
    }

    #[test]
    fn test_log_level_is_lowercased() {
        let options = ConfigMerger::new("/p")
            .with_file_config(StormConfig {
                log_level: Some(" WARN ".into()),
                ..Default::default()
            })
            .resolve()
            .unwrap();
        assert_eq!(options.log_level, "warn");
    }
}
