use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use storm_core::Mode;

#[derive(Parser, Debug)]
#[command(name = "storm")]
#[command(version, about = "Storm Stack lifecycle engine and workers", long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug          Enable debug logging\n    STORM_ENV=development   Build mode when --mode is not given\n    STORM_WORKSPACE_ROOT    Workspace root override")]
pub struct Storm {
    /// Project directory (defaults to the current directory)
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Build mode: production, development or test
    #[arg(long, global = true)]
    pub mode: Option<Mode>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate runtime and type files, then run the build phases
    #[command(visible_alias = "b")]
    Build,
    /// Generate runtime and type files only
    Prepare,
    /// Run the documentation phase
    Docs,
    /// Remove generated runtime, types and output directories
    Clean,
    /// Scaffold a new project
    New {
        #[command(subcommand)]
        kind: NewKind,
    },
    /// Add something to the project configuration
    Add {
        #[command(subcommand)]
        item: AddItem,
    },
    /// Remove caches, leftover temp files and stale locks from the artifacts directory
    Gc,
    /// Merge a config reflection into a reflection file
    CommitConfig(CommitArgs),
    /// Merge a variables reflection into a reflection file
    CommitVars(CommitArgs),
    /// Print the code of an error message, assigning one if it is new
    ErrorLookup {
        /// Error type the message belongs to
        #[arg(long = "type")]
        error_type: String,

        /// Exact message text
        #[arg(long)]
        message: String,

        /// Error code table (JSON)
        #[arg(long)]
        file_path: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum NewKind {
    /// Scaffold an application project
    Application(NewArgs),
    /// Scaffold a library project
    Library(NewArgs),
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Project name, optionally scoped (e.g. @acme/api)
    pub name: String,

    /// Overwrite an existing project
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Subcommand, Debug)]
pub enum AddItem {
    /// Append a plugin to storm.config.json
    Plugin {
        /// Plugin name, e.g. log or @storm-stack/plugin-log
        name: String,

        /// Plugin options as a JSON object
        #[arg(long)]
        options: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Reflection file to merge into
    #[arg(long)]
    pub file_path: PathBuf,

    /// JSON file holding the serialized type (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<PathBuf>,
}
