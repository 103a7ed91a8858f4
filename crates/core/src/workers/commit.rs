//! Commit workers: merge a fresh reflection into the persisted one

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::reflection::{SerializedType, merge};
use crate::utils::fs::{FileLock, atomic_write, read_optional, to_formatted_json};

/// Which reflection file a commit targets; only used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectionKind {
    Config,
    Vars,
}

crate::impl_lenient_enum!(
    ReflectionKind,
    Config => "config",
    Vars => "vars"
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub serialized_type: SerializedType,
    pub file_path: PathBuf,
}

impl CommitRequest {
    pub fn new(serialized_type: SerializedType, file_path: impl Into<PathBuf>) -> Self {
        Self {
            serialized_type,
            file_path: file_path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    /// The reflection now persisted at the target path
    pub reflection: SerializedType,
    /// False when the merge changed nothing and the write was skipped
    pub written: bool,
}

/// Merge a config reflection into `request.file_path`
pub fn commit_config(request: CommitRequest) -> Result<CommitOutcome> {
    commit_reflection(ReflectionKind::Config, request)
}

/// Merge a variables reflection into `request.file_path`
pub fn commit_vars(request: CommitRequest) -> Result<CommitOutcome> {
    commit_reflection(ReflectionKind::Vars, request)
}

pub fn commit_reflection(kind: ReflectionKind, request: CommitRequest) -> Result<CommitOutcome> {
    if request.file_path.as_os_str().is_empty() {
        return Err(Error::Precondition(format!(
            "commit-{kind} requires a file path"
        )));
    }
    let path = request.file_path.as_path();
    let _lock = FileLock::acquire(path)?;

    let existing = load_reflection(path)?;
    let mut incoming = request.serialized_type;
    incoming.refresh_signature();

    let merged = match existing {
        Some(ref existing) => merge(existing.clone(), incoming),
        None => incoming,
    };

    if existing.as_ref().is_some_and(|e| e.same_content(&merged)) {
        debug!("{kind} reflection at {} is unchanged", path.display());
        return Ok(CommitOutcome {
            reflection: merged,
            written: false,
        });
    }

    atomic_write(path, to_formatted_json(&merged)?.as_bytes())?;
    info!(
        "Committed {kind} reflection '{}' ({} properties) to {}",
        merged.name,
        merged.properties.len(),
        path.display()
    );

    Ok(CommitOutcome {
        reflection: merged,
        written: true,
    })
}

/// Read a persisted reflection; malformed content is an error, never replaced
pub fn load_reflection(path: &Path) -> Result<Option<SerializedType>> {
    let Some(bytes) = read_optional(path)? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| Error::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::SerializedProperty;
    use tempfile::TempDir;

    fn vars(props: &[&str]) -> SerializedType {
        props.iter().fold(SerializedType::new("StormVariables"), |t, p| {
            t.with_property(SerializedProperty::new(*p, "string"))
        })
    }

    #[test]
    fn test_commit_twice_unions_properties() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reflections/vars.json");

        commit_vars(CommitRequest::new(vars(&["a", "b"]), &path)).unwrap();
        let outcome = commit_vars(CommitRequest::new(vars(&["b", "c"]), &path)).unwrap();

        assert!(outcome.written);
        let persisted = load_reflection(&path).unwrap().unwrap();
        assert_eq!(persisted.property_names(), vec!["a", "b", "c"]);
        assert_eq!(persisted, outcome.reflection);
    }

    #[test]
    fn test_unchanged_commit_skips_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        assert!(commit_config(CommitRequest::new(vars(&["a"]), &path)).unwrap().written);
        let outcome = commit_config(CommitRequest::new(vars(&["a"]), &path)).unwrap();
        assert!(!outcome.written);
    }

    #[test]
    fn test_missing_file_path_fails_before_io() {
        let err = commit_config(CommitRequest::new(vars(&["a"]), "")).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[test]
    fn test_malformed_existing_file_is_preserved() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vars.json");
        std::fs::write(&path, "{ hand edited, oops").unwrap();

        let err = commit_vars(CommitRequest::new(vars(&["a"]), &path)).unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ hand edited, oops");
        assert!(!FileLock::lock_path_for(&path).exists());
    }

    #[test]
    fn test_file_is_formatted_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vars.json");
        commit_vars(CommitRequest::new(vars(&["a"]), &path)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("{\n  \"name\": \"StormVariables\""));
        assert!(contents.ends_with("}\n"));
    }

    #[test]
    fn test_concurrent_commits_lose_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vars.json");

        std::thread::scope(|scope| {
            for i in 0..8 {
                let path = path.clone();
                scope.spawn(move || {
                    let name = format!("VAR_{i}");
                    commit_vars(CommitRequest::new(vars(&[name.as_str()]), path)).unwrap();
                });
            }
        });

        let persisted = load_reflection(&path).unwrap().unwrap();
        assert_eq!(persisted.properties.len(), 8);
    }
}
