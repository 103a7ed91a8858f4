//! Plugin interface and the registry of known plugins
//!
//! A plugin contributes hooks to lifecycle phases. Plugins are instantiated
//! from the configured [`PluginEntry`] list through a [`PluginRegistry`],
//! ordered by their declared dependencies, and asked for their hooks exactly
//! once before the engine seals its hook registry.

pub mod dotenv;
pub mod errors;
pub mod log;
pub mod ordering;

pub use dotenv::DotenvPlugin;
pub use errors::ErrorPlugin;
pub use log::LogPlugin;
pub use ordering::order_plugins;

use std::collections::BTreeMap;
use std::fmt;

use crate::config::PluginEntry;
use crate::error::{Error, Result};
use crate::hooks::PhaseHooks;

/// Scope prefix accepted in front of built-in plugin names
pub const PLUGIN_PACKAGE_PREFIX: &str = "@storm-stack/plugin-";

/// Main plugin interface
pub trait Plugin: Send + Sync {
    /// Unique name, used for ordering and in logs
    fn name(&self) -> &str;

    /// npm package the plugin is published as
    fn package_name(&self) -> Option<&str> {
        None
    }

    /// Names of plugins whose output this plugin reads. They run first.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Attach hooks. Called exactly once per engine.
    fn add_hooks(&self, hooks: &mut PhaseHooks) -> Result<()>;
}

impl fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name())
            .field("dependencies", &self.dependencies())
            .finish()
    }
}

/// Builds a plugin from its configured options (`null` when none were given)
pub type PluginFactory = fn(&serde_json::Value) -> Result<Box<dyn Plugin>>;

/// Registry of plugin factories by name
#[derive(Clone)]
pub struct PluginRegistry {
    factories: BTreeMap<String, PluginFactory>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding the built-in `log`, `error` and `dotenv` plugins
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(log::NAME, LogPlugin::from_options);
        registry.register(errors::NAME, ErrorPlugin::from_options);
        registry.register(dotenv::NAME, DotenvPlugin::from_options);
        registry
    }

    /// Register a factory, replacing any previous one with the same name
    pub fn register(&mut self, name: &str, factory: PluginFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(canonical_name(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Create the plugin a config entry names
    pub fn instantiate(&self, entry: &PluginEntry) -> Result<Box<dyn Plugin>> {
        let name = canonical_name(entry.name());
        let factory = self.factories.get(name).ok_or_else(|| {
            Error::Config(format!(
                "Unknown plugin '{}'. Available plugins: {}",
                entry.name(),
                self.names().join(", ")
            ))
        })?;
        tracing::debug!("Instantiating plugin '{}'", name);
        factory(&entry.options())
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// `@storm-stack/plugin-log` and `log` name the same plugin
pub fn canonical_name(name: &str) -> &str {
    name.strip_prefix(PLUGIN_PACKAGE_PREFIX).unwrap_or(name)
}

/// Read an optional string option, failing when it has another type
pub(crate) fn string_option(plugin: &str, options: &serde_json::Value, key: &str) -> Result<Option<String>> {
    match options.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(Error::Config(format!(
            "Plugin '{plugin}' option '{key}' must be a string, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_registered() {
        let registry = PluginRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["dotenv", "error", "log"]);
        assert!(registry.contains("@storm-stack/plugin-log"));
    }

    #[test]
    fn test_instantiate_by_package_name() {
        let registry = PluginRegistry::with_builtins();
        let plugin = registry
            .instantiate(&PluginEntry::Name("@storm-stack/plugin-error".to_string()))
            .unwrap();
        assert_eq!(plugin.name(), "error");
        assert_eq!(plugin.package_name(), Some("@storm-stack/plugin-error"));
    }

    #[test]
    fn test_unknown_plugin_is_config_error() {
        let registry = PluginRegistry::with_builtins();
        let err = registry
            .instantiate(&PluginEntry::Name("sentry".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("sentry")));
    }

    #[test]
    fn test_string_option() {
        let options = serde_json::json!({ "level": "debug", "bad": 3 });
        assert_eq!(
            string_option("log", &options, "level").unwrap(),
            Some("debug".to_string())
        );
        assert_eq!(string_option("log", &options, "missing").unwrap(), None);
        assert_eq!(string_option("log", &serde_json::Value::Null, "level").unwrap(), None);
        assert!(string_option("log", &options, "bad").is_err());
    }
}
