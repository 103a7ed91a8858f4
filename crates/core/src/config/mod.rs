//! Configuration management for Storm projects

mod settings;
pub mod merge;
pub mod validation;

// Re-export main types
pub use merge::{ConfigMerger, EnvLayer, ResolvedOptions};
pub use settings::{
    CONFIG_FILE_NAMES, DotenvConfig, ErrorsConfig, OutputConfig, OverrideConfig, PluginEntry,
    StormConfig,
};
pub use validation::validate_options;

/// Kind of project being generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectType {
    #[default]
    Library,
    Application,
}

crate::impl_lenient_enum!(
    ProjectType,
    Library => "library",
    Application => "application"
);

/// Build mode, normally taken from `STORM_ENV` / `NODE_ENV`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Production,
    Development,
    Test,
}

crate::impl_lenient_enum!(
    Mode,
    Production => "production",
    Development => "development",
    Test => "test"
);

/// Where finalized VFS content goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Write generated files to disk
    #[default]
    Fs,
    /// Keep generated files in memory only
    Virtual,
}

crate::impl_lenient_enum!(
    OutputMode,
    Fs => "fs",
    Virtual => "virtual"
);
