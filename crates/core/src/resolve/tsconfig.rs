//! tsconfig loading (JSON with comments and trailing commas)

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTsconfig {
    pub path: PathBuf,
    pub raw: Value,
}

impl ResolvedTsconfig {
    /// Read `compilerOptions.<name>`
    pub fn compiler_option(&self, name: &str) -> Option<&Value> {
        self.raw.get("compilerOptions")?.get(name)
    }

    /// `compilerOptions.paths` aliases, first target of each entry
    pub fn path_aliases(&self) -> Vec<(String, String)> {
        let Some(Value::Object(paths)) = self.compiler_option("paths") else {
            return Vec::new();
        };
        paths
            .iter()
            .filter_map(|(alias, targets)| {
                let first = targets.as_array()?.first()?.as_str()?;
                Some((alias.clone(), first.to_string()))
            })
            .collect()
    }
}

/// Load the tsconfig at `path`, `None` if the file does not exist
pub fn load_tsconfig(path: &Path) -> Result<Option<ResolvedTsconfig>> {
    if !path.is_file() {
        tracing::debug!("No tsconfig at {}", path.display());
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let raw = serde_json::from_str(&strip_jsonc(&contents)).map_err(|e| {
        Error::Config(format!("Failed to parse {}: {e}", path.display()))
    })?;
    Ok(Some(ResolvedTsconfig {
        path: path.to_path_buf(),
        raw,
    }))
}

/// Remove `//` and `/* */` comments and trailing commas outside of strings
pub fn strip_jsonc(input: &str) -> String {
    strip_trailing_commas(&strip_comments(input))
}

fn strip_comments(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            in_string = c != '"';
            i += 1;
            continue;
        }

        match c {
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i += 2;
            }
            _ => {
                in_string = c == '"';
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == ',' {
            let next = chars[i + 1..].iter().copied().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        in_string = c == '"';
        out.push(c);
    }
    out
}
