//! Workers that persist accumulated metadata between builds
//!
//! Each worker performs a locked read-modify-write on a shared file, so
//! parallel builds touching the same reflection or code table serialize
//! instead of clobbering each other. The CLI exposes every worker as a
//! subcommand so they can also run out of process.

pub mod commit;
pub mod error_lookup;

pub use commit::{CommitOutcome, CommitRequest, ReflectionKind, commit_config, commit_vars};
pub use error_lookup::{ErrorTable, FindRequest, ensure_table, find};
