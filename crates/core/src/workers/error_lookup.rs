//! Error-code lookup worker
//!
//! The code table is persisted as `{ "<type>": { "<code>": "<message>" } }`.
//! Messages are deduplicated by exact match; a new message gets the next
//! free numeric code for its type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::utils::fs::{FileLock, atomic_write, to_formatted_json};

/// error type -> code -> message
pub type ErrorTable = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindRequest {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub file_path: PathBuf,
}

impl FindRequest {
    pub fn new(
        message: impl Into<String>,
        error_type: impl Into<String>,
        file_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            message: message.into(),
            error_type: error_type.into(),
            file_path: file_path.into(),
        }
    }
}

/// Return the code for `request.message`, assigning and persisting a new one if needed
pub fn find(request: &FindRequest) -> Result<String> {
    if request.file_path.as_os_str().is_empty() {
        return Err(Error::Precondition("error-lookup requires a file path".to_string()));
    }
    if request.error_type.trim().is_empty() {
        return Err(Error::Precondition("error-lookup requires an error type".to_string()));
    }
    if request.message.is_empty() {
        return Err(Error::Precondition("error-lookup requires a message".to_string()));
    }

    let path = request.file_path.as_path();
    if !path.is_file() {
        return Err(Error::io(
            path,
            io::Error::new(io::ErrorKind::NotFound, "error code table does not exist"),
        ));
    }
    let _lock = FileLock::acquire(path)?;

    let mut table = load_table(path)?;
    let codes = table.entry(request.error_type.clone()).or_default();

    if let Some(code) = find_existing(codes, &request.message) {
        debug!("Found existing {} error code {}", request.error_type, code);
        return Ok(code);
    }

    let code = next_code(codes).ok_or_else(|| Error::Malformed {
        path: path.to_path_buf(),
        reason: format!("no code left after {} for type '{}'", u64::MAX, request.error_type),
    })?;
    codes.insert(code.clone(), request.message.clone());
    atomic_write(path, to_formatted_json(&table)?.as_bytes())?;

    info!(
        "Assigned {} error code {} to \"{}\"",
        request.error_type, code, request.message
    );
    Ok(code)
}

/// Load the code table. A missing file is an error; use [`ensure_table`] first.
pub fn load_table(path: &Path) -> Result<ErrorTable> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&contents).map_err(|e| Error::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Create an empty `{}` table if none exists. Returns whether one was created.
pub fn ensure_table(path: &Path) -> Result<bool> {
    let _lock = FileLock::acquire(path)?;
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, to_formatted_json(&ErrorTable::new())?.as_bytes())?;
    debug!("Created error code table at {}", path.display());
    Ok(true)
}

/// Exact-match scan; with duplicate messages the lowest numeric code wins
fn find_existing(codes: &BTreeMap<String, String>, message: &str) -> Option<String> {
    codes
        .iter()
        .filter(|(_, existing)| existing.as_str() == message)
        .map(|(code, _)| code)
        .min_by_key(|code| (code.parse::<u64>().unwrap_or(u64::MAX), code.to_string()))
        .cloned()
}

/// Highest numeric code plus one, or `"1"` when there is none.
///
/// Codes are compared as integers, so `"10"` beats `"9"` regardless of key order.
/// Returns `None` once the highest code is `u64::MAX`.
pub fn next_code(codes: &BTreeMap<String, String>) -> Option<String> {
    match codes.keys().filter_map(|code| code.parse::<u64>().ok()).max() {
        Some(max) => max.checked_add(1).map(|next| next.to_string()),
        None => Some("1".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table_with(path: &Path, table: serde_json::Value) {
        std::fs::write(path, serde_json::to_string_pretty(&table).unwrap()).unwrap();
    }

    #[test]
    fn test_assigns_next_code() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("codes.json");
        table_with(&path, serde_json::json!({ "general": { "1": "A", "2": "B" } }));

        let code = find(&FindRequest::new("C", "general", &path)).unwrap();
        assert_eq!(code, "3");
        assert_eq!(load_table(&path).unwrap()["general"]["3"], "C");
    }

    #[test]
    fn test_first_code_for_new_type() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("codes.json");
        table_with(&path, serde_json::json!({ "general": { "1": "A" } }));

        assert_eq!(find(&FindRequest::new("bad input", "validation", &path)).unwrap(), "1");
    }

    #[test]
    fn test_repeated_message_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("codes.json");
        ensure_table(&path).unwrap();

        let request = FindRequest::new("X", "general", &path);
        let first = find(&request).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();
        let second = find(&request).unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert_eq!(load_table(&path).unwrap()["general"].len(), 1);
    }

    #[test]
    fn test_numeric_max_not_lexical() {
        let codes = BTreeMap::from([
            ("9".to_string(), "a".to_string()),
            ("10".to_string(), "b".to_string()),
            ("oops".to_string(), "c".to_string()),
        ]);
        assert_eq!(next_code(&codes).as_deref(), Some("11"));
        assert_eq!(next_code(&BTreeMap::new()).as_deref(), Some("1"));

        let only_garbage = BTreeMap::from([("NaN".to_string(), "x".to_string())]);
        assert_eq!(next_code(&only_garbage).as_deref(), Some("1"));
    }

    #[test]
    fn test_exhausted_code_space_is_malformed() {
        let codes = BTreeMap::from([(u64::MAX.to_string(), "x".to_string())]);
        assert_eq!(next_code(&codes), None);

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("codes.json");
        std::fs::write(&path, format!("{{\"general\":{{\"{}\":\"x\"}}}}", u64::MAX)).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let err = find(&FindRequest::new("new", "general", &path)).unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert_eq!(find(&FindRequest::new("x", "general", &path)).unwrap(), u64::MAX.to_string());
    }

    #[test]
    fn test_duplicate_messages_pick_lowest_code() {
        let codes = BTreeMap::from([
            ("10".to_string(), "dup".to_string()),
            ("2".to_string(), "dup".to_string()),
        ]);
        assert_eq!(find_existing(&codes, "dup"), Some("2".to_string()));
        assert_eq!(find_existing(&codes, "Dup"), None);
    }

    #[test]
    fn test_missing_table_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let err = find(&FindRequest::new("X", "general", temp_dir.path().join("none.json")))
            .unwrap_err();
        assert!(err.is_not_found());

        let nested = temp_dir.path().join("errors");
        let err = find(&FindRequest::new("X", "general", nested.join("codes.json"))).unwrap_err();
        assert!(err.is_not_found());
        assert!(!nested.exists());
        assert!(!temp_dir.path().join("none.json.lock").exists());
    }

    #[test]
    fn test_missing_inputs_are_preconditions() {
        assert!(matches!(
            find(&FindRequest::new("X", "general", "")),
            Err(Error::Precondition(_))
        ));
        assert!(matches!(
            find(&FindRequest::new("X", " ", "codes.json")),
            Err(Error::Precondition(_))
        ));
        assert!(matches!(
            find(&FindRequest::new("", "general", "codes.json")),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn test_ensure_table_only_creates_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("errors/codes.json");
        assert!(ensure_table(&path).unwrap());
        assert!(!ensure_table(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }
}
