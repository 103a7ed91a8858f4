//! Hook registry: ordered callbacks per lifecycle phase

use std::fmt;

use tracing::{debug, debug_span, error};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::phase::Phase;

/// A hook callback. It receives the shared context of the current run.
pub type HookFn = Box<dyn FnMut(&mut Context) -> Result<()> + Send>;

/// Hooks a single plugin wants to attach, collected during `add_hooks`
#[derive(Default)]
pub struct PhaseHooks {
    entries: Vec<(Phase, HookFn)>,
}

impl PhaseHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a callback to `phase`. Multiple callbacks for one phase keep their order.
    pub fn on<F>(&mut self, phase: Phase, hook: F) -> &mut Self
    where
        F: FnMut(&mut Context) -> Result<()> + Send + 'static,
    {
        self.entries.push((phase, Box::new(hook)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Phases touched by these hooks, in attachment order
    pub fn phases(&self) -> Vec<Phase> {
        self.entries.iter().map(|(phase, _)| *phase).collect()
    }
}

impl fmt::Debug for PhaseHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseHooks")
            .field("phases", &self.phases())
            .finish()
    }
}

struct RegisteredHook {
    owner: String,
    hook: HookFn,
}

/// Maps every [`Phase`] to the hooks registered for it.
///
/// Insertion order is invocation order. Once sealed, the registry rejects
/// further registrations.
pub struct HookRegistry {
    hooks: [Vec<RegisteredHook>; Phase::COUNT],
    sealed: bool,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            hooks: std::array::from_fn(|_| Vec::new()),
            sealed: false,
        }
    }

    /// Append `owner`'s hooks. Calling again for the same phase accumulates.
    pub fn add_hooks(&mut self, owner: &str, hooks: PhaseHooks) -> Result<()> {
        if self.sealed {
            return Err(Error::Config(format!(
                "Plugin '{owner}' tried to register hooks after engine setup completed"
            )));
        }

        for (phase, hook) in hooks.entries {
            debug!("Registering hook for '{}' from plugin '{}'", phase, owner);
            self.hooks[phase.index()].push(RegisteredHook {
                owner: owner.to_string(),
                hook,
            });
        }
        Ok(())
    }

    /// Stop accepting registrations
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Run every hook for `phase` in order, stopping at the first failure.
    ///
    /// Returns the number of hooks that ran. The failing hook's error is
    /// returned unchanged.
    pub fn call_hook(&mut self, phase: Phase, ctx: &mut Context) -> Result<usize> {
        let hooks = &mut self.hooks[phase.index()];
        if hooks.is_empty() {
            debug!("No hooks registered for '{}'", phase);
            return Ok(0);
        }

        let total = hooks.len();
        for (ran, registered) in hooks.iter_mut().enumerate() {
            let _span = debug_span!("hook", phase = %phase, plugin = %registered.owner).entered();
            if let Err(e) = (registered.hook)(ctx) {
                error!(
                    "Hook from plugin '{}' failed during '{}' ({} of {} hooks ran): {}",
                    registered.owner, phase, ran, total, e
                );
                return Err(e);
            }
        }

        Ok(total)
    }

    /// Number of hooks registered for `phase`
    pub fn len(&self, phase: Phase) -> usize {
        self.hooks[phase.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.iter().all(Vec::is_empty)
    }

    /// Plugin names owning the hooks of `phase`, in invocation order
    pub fn owners(&self, phase: Phase) -> Vec<&str> {
        self.hooks[phase.index()]
            .iter()
            .map(|h| h.owner.as_str())
            .collect()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for phase in Phase::ALL {
            if self.len(phase) > 0 {
                map.entry(&phase.as_str(), &self.owners(phase));
            }
        }
        map.finish()
    }
}
