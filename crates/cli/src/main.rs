use clap::Parser;
use std::path::PathBuf;
use storm_cli::{Storm, logging, run};

fn main() {
    let cli = Storm::parse();

    let root = cli.cwd.clone().unwrap_or_else(|| PathBuf::from("."));
    logging::init(cli.verbose, &root);

    if let Err(e) = run(cli) {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}
