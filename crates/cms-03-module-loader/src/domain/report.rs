//! # Load Reports
//!
//! What one discovery or load run did, per module.

use std::path::PathBuf;

/// Which pass a module was handled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPass {
    /// Pass 1: every active entry.
    Initial,
    /// Pass 2: inactive entries carrying a `last_error`.
    Retry,
}

/// Result for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Passed both phases; error cleared.
    Loaded,
    /// Passed on the retry pass; active again.
    Reactivated,
    /// Not admitted. Normally also recorded as `last_error`, unless the
    /// registry write itself failed.
    Failed(String),
    /// Registry untouched.
    Skipped(SkipReason),
}

/// Why a module was not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The plugin folder is gone.
    SourceMissing,
    /// The module is in meltdown; only an explicit reactivation plus restart brings it back.
    Meltdown,
    /// The name belongs to a core module.
    ReservedName,
}

/// Per-module outcomes of one `load_all` run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub outcomes: Vec<(String, LoadPass, LoadOutcome)>,
}

impl LoadReport {
    pub(crate) fn record(&mut self, module: &str, pass: LoadPass, outcome: LoadOutcome) {
        self.outcomes.push((module.to_string(), pass, outcome));
    }

    /// Modules live after this run (loaded or reactivated).
    pub fn live(&self) -> Vec<&str> {
        self.names(|o| matches!(o, LoadOutcome::Loaded | LoadOutcome::Reactivated))
    }

    /// Modules reactivated by the retry pass.
    pub fn reactivated(&self) -> Vec<&str> {
        self.names(|o| matches!(o, LoadOutcome::Reactivated))
    }

    /// Modules deactivated by this run.
    pub fn failed(&self) -> Vec<&str> {
        self.names(|o| matches!(o, LoadOutcome::Failed(_)))
    }

    /// Modules skipped without registry changes.
    pub fn skipped(&self) -> Vec<&str> {
        self.names(|o| matches!(o, LoadOutcome::Skipped(_)))
    }

    /// Outcome for `module`, last one wins.
    pub fn outcome(&self, module: &str) -> Option<&LoadOutcome> {
        self.outcomes
            .iter()
            .rev()
            .find(|(name, _, _)| name == module)
            .map(|(_, _, outcome)| outcome)
    }

    fn names(&self, keep: impl Fn(&LoadOutcome) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, _, outcome)| keep(outcome))
            .map(|(name, _, _)| name.as_str())
            .collect()
    }
}

/// What a discovery scan found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Every plugin with a valid manifest, sorted.
    pub discovered: Vec<String>,
    /// Newly inserted into the registry.
    pub registered: Vec<String>,
    /// Folders whose manifest could not be used.
    pub invalid: Vec<(PathBuf, String)>,
}
