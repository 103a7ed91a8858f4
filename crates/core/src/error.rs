use std::io;
use std::path::PathBuf;

/// Errors that can occur while running the Storm engine and its workers
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required identifier was missing; raised before any I/O happens
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid path {}: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("TOML error: {0}")]
    Toml(String),

    /// Existing content on disk could not be parsed and was left untouched
    #[error("Malformed file {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Failed to lock {}: {reason}", path.display())]
    Lock { path: PathBuf, reason: String },

    #[error("Plugin '{plugin}' failed: {message}")]
    Plugin { plugin: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Wrap an I/O error with the path it occurred at
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Whether the underlying cause is a missing file
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Io { source, .. } | Error::IoError(source) => {
                source.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Encoding(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err.to_string())
    }
}

/// Result type alias for Storm engine operations
pub type Result<T> = std::result::Result<T, Error>;
