//! `.env` file loading

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Variables loaded from the configured `.env` files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDotenv {
    pub values: BTreeMap<String, String>,
    /// Files that existed and were loaded, in load order
    pub files: Vec<PathBuf>,
}

impl ResolvedDotenv {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Load `files` in order; later files override earlier ones and missing files are skipped
pub fn load_dotenv(files: &[PathBuf]) -> Result<ResolvedDotenv> {
    let mut resolved = ResolvedDotenv::default();
    for file in files {
        if !file.is_file() {
            debug!("Skipping missing dotenv file {}", file.display());
            continue;
        }
        let parsed = parse_dotenv(file)?;
        debug!("Loaded {} variables from {}", parsed.len(), file.display());
        resolved.values.extend(parsed);
        resolved.files.push(file.clone());
    }
    Ok(resolved)
}

/// Parse one `.env` file with the `dotenv` crate's line parser
pub fn parse_dotenv(path: &Path) -> Result<BTreeMap<String, String>> {
    let iter = dotenv::from_path_iter(path).map_err(|e| dotenv_error(path, e))?;
    let mut values = BTreeMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| dotenv_error(path, e))?;
        values.insert(key, value);
    }
    Ok(values)
}

fn dotenv_error(path: &Path, error: dotenv::Error) -> Error {
    match error {
        dotenv::Error::Io(e) => Error::io(path, e),
        other => Error::Config(format!("{}: {other}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(contents: &str) -> Result<BTreeMap<String, String>> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".env");
        fs::write(&path, contents).unwrap();
        parse_dotenv(&path)
    }

    #[test]
    fn test_parse_forms() {
        let values = parse(
            r#"
# comment
PORT=3000
export HOST=localhost
GREETING="hello\nworld"
RAW='keep \n literal'
EMPTY=
"#,
        )
        .unwrap();

        assert_eq!(values["PORT"], "3000");
        assert_eq!(values["HOST"], "localhost");
        assert_eq!(values["GREETING"], "hello\nworld");
        assert_eq!(values["RAW"], "keep \\n literal");
        assert_eq!(values["EMPTY"], "");
    }

    #[test]
    fn test_escaped_backslash_is_not_a_newline() {
        let values = parse("WIN_PATH=\"C:\\\\new\"\n").unwrap();
        assert_eq!(values["WIN_PATH"], "C:\\new");
    }

    #[test]
    fn test_parse_errors_name_the_file() {
        let err = parse("OK=1\nnot a pair\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains(".env"));
    }

    #[test]
    fn test_later_files_win() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join(".env");
        let local = temp_dir.path().join(".env.local");
        fs::write(&base, "A=base\nB=base\n").unwrap();
        fs::write(&local, "B=local\n").unwrap();

        let resolved = load_dotenv(&[
            base.clone(),
            temp_dir.path().join(".env.missing"),
            local.clone(),
        ])
        .unwrap();

        assert_eq!(resolved.get("A"), Some("base"));
        assert_eq!(resolved.get("B"), Some("local"));
        assert_eq!(resolved.files, vec![base, local]);
    }
}
