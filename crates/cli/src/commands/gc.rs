use anyhow::{Context, Result};
use std::{fs, path::Path};
use storm_core::ConfigMerger;
use storm_core::utils::fs::{STALE_LOCK_AGE, is_older_than};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Cache directory under the artifacts directory removed by `gc`
pub const CACHE_DIR: &str = "cache";

/// Clean the artifacts directory of the project at `root`. Returns the number of removed entries.
pub fn gc_command(root: &Path) -> Result<usize> {
    let options = ConfigMerger::new(root)
        .load_file()
        .and_then(|merger| merger.resolve())
        .with_context(|| format!("Failed to load configuration in {}", root.display()))?;
    let artifacts = &options.artifacts_dir;

    println!("🧹 Collecting garbage in {}", artifacts.display());
    let removed = collect_garbage(artifacts)?;
    println!("✅ Removed {removed} entries");
    Ok(removed)
}

pub fn collect_garbage(artifacts: &Path) -> Result<usize> {
    if !artifacts.exists() {
        debug!("No artifacts directory at {}", artifacts.display());
        return Ok(0);
    }

    let mut removed = 0;
    let cache = artifacts.join(CACHE_DIR);
    if cache.is_dir() {
        fs::remove_dir_all(&cache)
            .with_context(|| format!("Failed to remove {}", cache.display()))?;
        info!("Removed {}", cache.display());
        removed += 1;
    }

    for entry in WalkDir::new(artifacts)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        // Locks and in-flight atomic writes belong to a live worker until they go stale
        let is_leftover = name.ends_with(".lock")
            || name.ends_with(".lock.break")
            || name.starts_with(".tmp")
            || name.ends_with(".tmp");
        let is_garbage = is_leftover && is_older_than(path, STALE_LOCK_AGE);

        if is_garbage {
            match fs::remove_file(path) {
                Ok(()) => {
                    info!("Removed {}", path.display());
                    removed += 1;
                }
                Err(e) => eprintln!("   ⚠️  Failed to remove {}: {}", path.display(), e),
            }
        }
    }

    Ok(removed)
}
