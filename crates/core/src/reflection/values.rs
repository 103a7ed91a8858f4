//! Binary stores for resolved config values and secrets
//!
//! Unlike the JSON reflection files, `config-values.bin` and
//! `config-secrets.bin` are bincode payloads. Consumers read them in that
//! format, so the two persistence strategies stay separate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::fs::{FileLock, atomic_write, read_optional};

pub const CONFIG_VALUES_FILE: &str = "config-values.bin";
pub const CONFIG_SECRETS_FILE: &str = "config-secrets.bin";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValues {
    pub values: BTreeMap<String, String>,
}

impl ConfigValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Read a store, `None` when the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match read_optional(path)? {
            Some(bytes) => Self::from_bytes(&bytes).map(Some).map_err(|e| Error::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
            None => Ok(None),
        }
    }

    /// Merge these values into the store at `path`; incoming values win per key
    pub fn commit(&self, path: &Path) -> Result<ConfigValues> {
        let _lock = FileLock::acquire(path)?;
        let mut merged = Self::load(path)?.unwrap_or_default();
        merged.values.extend(self.values.clone());
        atomic_write(path, &merged.to_bytes()?)?;
        tracing::debug!("Committed {} config values to {}", merged.len(), path.display());
        Ok(merged)
    }
}
