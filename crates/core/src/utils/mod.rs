//! Shared helpers

pub mod fs;
pub mod serde_helpers;
