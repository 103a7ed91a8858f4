//! The lifecycle engine
//!
//! An [`Engine`] owns one run: the frozen options, the [`Context`] every hook
//! mutates, and the sealed [`HookRegistry`]. Phases execute in the fixed
//! [`Phase::ALL`] order and never re-run. Generated files stay in the VFS
//! until [`Engine::finalize`]; a failure anywhere discards them.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span, warn};

use crate::config::{ConfigMerger, EnvLayer, OutputMode, StormConfig, validate_options};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::hooks::{HookRegistry, PhaseHooks};
use crate::phase::{Phase, PhaseTracker};
use crate::plugins::{Plugin, PluginRegistry, order_plugins};
use crate::vfs::VfsNode;

/// A complete run, composed from the individual lifecycle steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// init, prepare, finalize
    Prepare,
    /// init, prepare, build, finalize
    Build,
    /// init, prepare, docs, finalize
    Docs,
    /// init, clean
    Clean,
}

crate::impl_lenient_enum!(
    EngineCommand,
    Prepare => "prepare",
    Build => "build",
    Docs => "docs",
    Clean => "clean"
);

/// What [`Engine::finalize`] did with the staged files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeReport {
    pub output_mode: OutputMode,
    /// Every staged path, sorted
    pub staged: Vec<PathBuf>,
    /// Paths written to disk; empty in virtual output mode
    pub written: Vec<PathBuf>,
    pub tree: Vec<VfsNode>,
}

/// Outcome of [`Engine::execute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub command: EngineCommand,
    /// Phases entered, in order
    pub phases: Vec<Phase>,
    pub finalize: Option<FinalizeReport>,
    /// Directories removed by `clean`
    pub removed: Vec<PathBuf>,
}

/// Configures and constructs an [`Engine`]
pub struct EngineBuilder {
    project_root: PathBuf,
    inline_config: Option<StormConfig>,
    env: Option<EnvLayer>,
    overrides: StormConfig,
    registry: PluginRegistry,
    extra_plugins: Vec<Box<dyn Plugin>>,
}

impl EngineBuilder {
    /// Use `config` instead of reading `storm.config.*` from the project root
    pub fn with_config(mut self, config: StormConfig) -> Self {
        self.inline_config = Some(config);
        self
    }

    /// Use `env` instead of the process environment
    pub fn with_env(mut self, env: EnvLayer) -> Self {
        self.env = Some(env);
        self
    }

    /// Highest-priority config layer, normally from CLI flags
    pub fn with_overrides(mut self, overrides: StormConfig) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_registry(mut self, registry: PluginRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Add a plugin instance after the configured ones
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.extra_plugins.push(Box::new(plugin));
        self
    }

    /// Merge and validate options, instantiate and order plugins, and seal the hooks
    pub fn build(self) -> Result<Engine> {
        let merger = ConfigMerger::new(&self.project_root);
        let merger = match self.inline_config {
            Some(config) => merger.with_file_config(config),
            None => merger.load_file()?,
        };
        let options = merger
            .with_env(self.env.unwrap_or_else(EnvLayer::from_env))
            .with_overrides(self.overrides)
            .resolve()?;
        validate_options(&options)?;

        let mut plugins = Vec::with_capacity(options.plugins.len() + self.extra_plugins.len());
        for entry in &options.plugins {
            plugins.push(self.registry.instantiate(entry)?);
        }
        plugins.extend(self.extra_plugins);
        let plugins = order_plugins(plugins)?;

        let mut hooks = HookRegistry::new();
        for plugin in &plugins {
            let mut phase_hooks = PhaseHooks::new();
            plugin.add_hooks(&mut phase_hooks)?;
            debug!(
                "Plugin '{}' registered {} hooks",
                plugin.name(),
                phase_hooks.len()
            );
            hooks.add_hooks(plugin.name(), phase_hooks)?;
        }
        hooks.seal();

        info!(
            "Engine ready for '{}' ({}) with {} plugins",
            options.name,
            options.project_type,
            plugins.len()
        );

        Ok(Engine {
            plugins: plugins.iter().map(|p| p.name().to_string()).collect(),
            context: Context::new(options),
            hooks,
            tracker: PhaseTracker::new(),
        })
    }
}

/// One lifecycle run over a project
pub struct Engine {
    context: Context,
    hooks: HookRegistry,
    tracker: PhaseTracker,
    plugins: Vec<String>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("project", &self.context.options().name)
            .field("plugins", &self.plugins)
            .field("completed", &self.tracker.completed())
            .finish()
    }
}

impl Engine {
    pub fn builder(project_root: impl Into<PathBuf>) -> EngineBuilder {
        EngineBuilder {
            project_root: project_root.into(),
            inline_config: None,
            env: None,
            overrides: StormConfig::default(),
            registry: PluginRegistry::with_builtins(),
            extra_plugins: Vec::new(),
        }
    }

    /// Engine for the project at `project_root`, with `overrides` above its config file
    pub fn new(project_root: impl Into<PathBuf>, overrides: StormConfig) -> Result<Self> {
        Self::builder(project_root).with_overrides(overrides).build()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Plugin names in hook order
    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    pub fn completed_phases(&self) -> &[Phase] {
        self.tracker.completed()
    }

    /// Resolve project metadata, then run `init:context` and `init:installs`
    pub fn init(&mut self) -> Result<()> {
        self.guarded(|engine| {
            engine.tracker.enter(Phase::InitContext)?;
            engine.context.resolve_metadata()?;
            engine.call(Phase::InitContext)?;

            engine.run_phase(Phase::InitInstalls)?;
            for install in &engine.context.installs {
                info!(
                    "Plugin '{}' requires {}{}",
                    install.requested_by,
                    install.name,
                    if install.dev { " (dev)" } else { "" }
                );
            }
            Ok(())
        })
    }

    /// `prepare:types` then `prepare:runtime`
    pub fn prepare(&mut self) -> Result<()> {
        self.run_phases(&Phase::PREPARE)
    }

    /// `build:pre`, the build phase matching the project type, then `build:post`
    pub fn build(&mut self) -> Result<()> {
        let phases = Phase::build_phases(self.context.options().project_type);
        self.run_phases(&phases)
    }

    pub fn docs(&mut self) -> Result<()> {
        self.run_phases(&[Phase::DocsGenerate])
    }

    /// Run `clean` hooks, then delete generated directories and drop staged files.
    ///
    /// Persisted reflections and the error-code table are kept. Returns the removed directories.
    pub fn clean(&mut self) -> Result<Vec<PathBuf>> {
        self.guarded(|engine| {
            engine.run_phase(Phase::Clean)?;

            let options = engine.context.options_arc();
            let mut removed = Vec::new();
            for dir in [&options.runtime_dir, &options.types_dir, &options.output_path] {
                if remove_generated_dir(&options.project_root, dir)? {
                    removed.push(dir.clone());
                }
            }
            engine.context.vfs.clear();

            info!("Cleaned {} directories", removed.len());
            Ok(removed)
        })
    }

    /// Run `finalize` hooks, then flush the VFS according to the output mode
    pub fn finalize(&mut self) -> Result<FinalizeReport> {
        self.guarded(|engine| {
            engine.run_phase(Phase::Finalize)?;

            let options = engine.context.options_arc();
            let vfs = &engine.context.vfs;
            let staged: Vec<PathBuf> = vfs.paths().map(Path::to_path_buf).collect();
            let written = match options.output_mode {
                OutputMode::Fs => vfs.flush(&options.project_root)?,
                OutputMode::Virtual => {
                    debug!("Virtual output mode, keeping {} files in memory", staged.len());
                    Vec::new()
                }
            };

            info!(
                "Finalized '{}': {} staged, {} written",
                options.name,
                staged.len(),
                written.len()
            );
            Ok(FinalizeReport {
                output_mode: options.output_mode,
                staged,
                written,
                tree: vfs.tree(),
            })
        })
    }

    /// Run a whole command
    pub fn execute(&mut self, command: EngineCommand) -> Result<RunReport> {
        let _span = info_span!("execute", command = %command).entered();
        self.init()?;

        let mut report = RunReport {
            command,
            phases: Vec::new(),
            finalize: None,
            removed: Vec::new(),
        };

        match command {
            EngineCommand::Clean => {
                report.removed = self.clean()?;
            }
            EngineCommand::Prepare => {
                self.prepare()?;
                report.finalize = Some(self.finalize()?);
            }
            EngineCommand::Build => {
                self.prepare()?;
                self.build()?;
                report.finalize = Some(self.finalize()?);
            }
            EngineCommand::Docs => {
                self.prepare()?;
                self.docs()?;
                report.finalize = Some(self.finalize()?);
            }
        }

        report.phases = self.tracker.completed().to_vec();
        Ok(report)
    }

    fn run_phases(&mut self, phases: &[Phase]) -> Result<()> {
        self.guarded(|engine| {
            for phase in phases {
                engine.run_phase(*phase)?;
            }
            Ok(())
        })
    }

    fn run_phase(&mut self, phase: Phase) -> Result<usize> {
        self.tracker.enter(phase)?;
        self.call(phase)
    }

    fn call(&mut self, phase: Phase) -> Result<usize> {
        let _span = info_span!("phase", phase = %phase).entered();
        let ran = self.hooks.call_hook(phase, &mut self.context)?;
        debug!("Phase '{}' ran {} hooks", phase, ran);
        Ok(ran)
    }

    /// Discard staged files when `op` fails, so a partial run never reaches disk
    fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = op(self);
        if let Err(ref e) = result {
            if !self.context.vfs.is_empty() {
                warn!(
                    "Discarding {} staged files after failure: {}",
                    self.context.vfs.len(),
                    e
                );
            }
            self.context.vfs.clear();
        }
        result
    }
}

/// Remove `dir` when it exists and lies inside `project_root`
fn remove_generated_dir(project_root: &Path, dir: &Path) -> Result<bool> {
    if dir == project_root || !dir.starts_with(project_root) {
        warn!("Not removing {}: outside of the project root", dir.display());
        return Ok(false);
    }
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!("Removed {}", dir.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(dir, e)),
    }
}
