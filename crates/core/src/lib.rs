//! storm-core - the Storm Stack plugin lifecycle engine
//!
//! This crate provides functionality to:
//! - Merge project configuration from files, the environment and overrides
//! - Run plugins' hooks through the fixed lifecycle phases
//! - Stage generated runtime and type files in a virtual file system
//! - Persist type reflections and error codes with locked, atomic workers
pub mod codegen;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod phase;
pub mod plugins;
pub mod reflection;
pub mod resolve;
pub mod utils;
pub mod vfs;
pub mod workers;

// Re-export commonly used types
pub use error::{Error, Result};

pub use config::{ConfigMerger, EnvLayer, Mode, OutputMode, ProjectType, ResolvedOptions, StormConfig};
pub use context::Context;
pub use engine::{Engine, EngineBuilder, EngineCommand, FinalizeReport, RunReport};
pub use hooks::{HookRegistry, PhaseHooks};
pub use phase::Phase;
pub use plugins::{Plugin, PluginRegistry};
pub use reflection::{SerializedProperty, SerializedType};
pub use vfs::{VirtualFileSystem, WriteOptions};
