//! Storm Stack - umbrella package over `storm-core`, hosting the cross-crate integration tests
pub use storm_core::*;
