//! Lifecycle phases of an engine run
//!
//! Phases form a fixed, forward-only sequence. Plugins attach hooks to
//! phases; the engine walks them in [`Phase::ALL`] order and never re-enters
//! a phase within one run.

use std::fmt;
use std::str::FromStr;

use crate::config::ProjectType;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    InitContext,
    InitInstalls,
    PrepareTypes,
    PrepareRuntime,
    BuildPre,
    BuildLibrary,
    BuildApplication,
    BuildPost,
    DocsGenerate,
    Clean,
    Finalize,
}

impl Phase {
    pub const COUNT: usize = 11;

    /// Every phase, in execution order
    pub const ALL: [Phase; Phase::COUNT] = [
        Phase::InitContext,
        Phase::InitInstalls,
        Phase::PrepareTypes,
        Phase::PrepareRuntime,
        Phase::BuildPre,
        Phase::BuildLibrary,
        Phase::BuildApplication,
        Phase::BuildPost,
        Phase::DocsGenerate,
        Phase::Clean,
        Phase::Finalize,
    ];

    pub const INIT: [Phase; 2] = [Phase::InitContext, Phase::InitInstalls];
    pub const PREPARE: [Phase; 2] = [Phase::PrepareTypes, Phase::PrepareRuntime];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::InitContext => "init:context",
            Phase::InitInstalls => "init:installs",
            Phase::PrepareTypes => "prepare:types",
            Phase::PrepareRuntime => "prepare:runtime",
            Phase::BuildPre => "build:pre",
            Phase::BuildLibrary => "build:library",
            Phase::BuildApplication => "build:application",
            Phase::BuildPost => "build:post",
            Phase::DocsGenerate => "docs:generate",
            Phase::Clean => "clean",
            Phase::Finalize => "finalize",
        }
    }

    /// Position of this phase in [`Phase::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Build phases for a project type; only one of library/application runs
    pub fn build_phases(project_type: ProjectType) -> [Phase; 3] {
        let main = match project_type {
            ProjectType::Library => Phase::BuildLibrary,
            ProjectType::Application => Phase::BuildApplication,
        };
        [Phase::BuildPre, main, Phase::BuildPost]
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Phase::ALL
            .iter()
            .copied()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| Error::Config(format!("Unknown lifecycle phase: {s}")))
    }
}

/// Tracks the forward-only progress of one engine run
#[derive(Debug, Default, Clone)]
pub struct PhaseTracker {
    last: Option<Phase>,
    completed: Vec<Phase>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `phase` may run now, and record it
    pub fn enter(&mut self, phase: Phase) -> Result<()> {
        if let Some(last) = self.last {
            if phase <= last {
                return Err(Error::Config(format!(
                    "Phase '{phase}' cannot run after '{last}': phases only move forward within a run"
                )));
            }
        }
        self.last = Some(phase);
        self.completed.push(phase);
        Ok(())
    }

    pub fn last(&self) -> Option<Phase> {
        self.last
    }

    pub fn completed(&self) -> &[Phase] {
        &self.completed
    }

    pub fn has_run(&self, phase: Phase) -> bool {
        self.completed.contains(&phase)
    }
}
