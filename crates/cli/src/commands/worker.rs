use anyhow::{Context, Result};
use std::{
    fs,
    io::{self, Read},
    path::Path,
};
use storm_core::SerializedType;
use storm_core::workers::{self, CommitRequest, FindRequest, ReflectionKind};

/// Read a serialized type from `input`, or from stdin when no input file is given
fn read_serialized_type(input: Option<&Path>) -> Result<SerializedType> {
    let raw = match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read the serialized type from stdin")?;
            buffer
        }
    };
    serde_json::from_str(&raw).context("Input is not a serialized type")
}

/// `commit-config` / `commit-vars`
pub fn commit_command(kind: ReflectionKind, file_path: &Path, input: Option<&Path>) -> Result<()> {
    let serialized_type = read_serialized_type(input)?;
    let request = CommitRequest::new(serialized_type, file_path);
    let outcome = match kind {
        ReflectionKind::Config => workers::commit_config(request),
        ReflectionKind::Vars => workers::commit_vars(request),
    }
    .with_context(|| format!("commit-{kind} failed for {}", file_path.display()))?;

    if outcome.written {
        println!(
            "✅ Committed {} ({} properties) to {}",
            outcome.reflection.name,
            outcome.reflection.properties.len(),
            file_path.display()
        );
    } else {
        println!("ℹ️  {} is already up to date", file_path.display());
    }
    Ok(())
}

/// `error-lookup`: print only the code so scripts can capture it
pub fn error_lookup_command(error_type: &str, message: &str, file_path: &Path) -> Result<String> {
    let request = FindRequest::new(message, error_type, file_path);
    let code = workers::find(&request)
        .with_context(|| format!("error-lookup failed for {}", file_path.display()))?;
    println!("{code}");
    Ok(code)
}
