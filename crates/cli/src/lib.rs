pub mod cli;
pub mod commands;
pub mod logging;
pub mod templates;

// Re-export commonly used items
pub use cli::{AddItem, Commands, NewKind, Storm};

use anyhow::Result;
use storm_core::workers::ReflectionKind;
use storm_core::{EngineCommand, ProjectType};

use crate::commands::project_root;

/// Execute a parsed command line
pub fn run(cli: Storm) -> Result<()> {
    let root = project_root(cli.cwd.as_ref())?;

    match cli.command {
        Commands::Build => commands::lifecycle_command(&root, cli.mode, EngineCommand::Build),
        Commands::Prepare => commands::lifecycle_command(&root, cli.mode, EngineCommand::Prepare),
        Commands::Docs => commands::lifecycle_command(&root, cli.mode, EngineCommand::Docs),
        Commands::Clean => commands::lifecycle_command(&root, cli.mode, EngineCommand::Clean),
        Commands::New { kind } => {
            let (project_type, args) = match kind {
                NewKind::Application(args) => (ProjectType::Application, args),
                NewKind::Library(args) => (ProjectType::Library, args),
            };
            commands::new_command(&root, project_type, &args.name, args.force).map(|_| ())
        }
        Commands::Add {
            item: AddItem::Plugin { name, options },
        } => commands::add_plugin_command(&root, &name, options.as_deref()).map(|_| ()),
        Commands::Gc => commands::gc_command(&root).map(|_| ()),
        Commands::CommitConfig(args) => {
            commands::commit_command(ReflectionKind::Config, &args.file_path, args.input.as_deref())
        }
        Commands::CommitVars(args) => {
            commands::commit_command(ReflectionKind::Vars, &args.file_path, args.input.as_deref())
        }
        Commands::ErrorLookup {
            error_type,
            message,
            file_path,
        } => commands::error_lookup_command(&error_type, &message, &file_path).map(|_| ()),
    }
}
