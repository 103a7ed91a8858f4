use anyhow::{Context, Result};
use std::path::Path;
use storm_core::{Engine, EngineCommand, Mode, StormConfig};
use tracing::debug;

/// Run `build`, `prepare`, `docs` or `clean` over the project at `root`
pub fn lifecycle_command(root: &Path, mode: Option<Mode>, command: EngineCommand) -> Result<()> {
    let overrides = StormConfig {
        mode,
        ..Default::default()
    };
    let mut engine = Engine::new(root, overrides)
        .with_context(|| format!("Failed to set up the engine in {}", root.display()))?;

    let options = engine.context().options();
    println!(
        "🚀 Running {} for {} ({}, {})",
        command, options.name, options.project_type, options.mode
    );
    debug!("Plugins: {:?}", engine.plugins());

    let report = engine
        .execute(command)
        .with_context(|| format!("storm {command} failed"))?;

    if let Some(finalize) = &report.finalize {
        println!("📦 Staged {} files", finalize.staged.len());
        for path in &finalize.written {
            let shown = path.strip_prefix(root).unwrap_or(path);
            println!("   • {}", shown.display());
        }
    }
    if command == EngineCommand::Clean {
        println!("🧹 Removed {} directories", report.removed.len());
        for dir in &report.removed {
            println!("   • {}", dir.display());
        }
    }

    let phases: Vec<&str> = report.phases.iter().map(|p| p.as_str()).collect();
    println!("✅ {} completed: {}", command, phases.join(" → "));
    Ok(())
}
