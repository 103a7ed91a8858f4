pub mod add;
pub mod gc;
pub mod lifecycle;
pub mod new;
pub mod worker;

pub use add::add_plugin_command;
pub use gc::gc_command;
pub use lifecycle::lifecycle_command;
pub use new::new_command;
pub use worker::{commit_command, error_lookup_command};

use anyhow::{Context, Result};
use std::{env, path::PathBuf};

/// The project directory: `--cwd` when given, the current directory otherwise
pub fn project_root(cwd: Option<&PathBuf>) -> Result<PathBuf> {
    match cwd {
        Some(cwd) => Ok(cwd.clone()),
        None => env::current_dir().context("Failed to get current directory"),
    }
}
