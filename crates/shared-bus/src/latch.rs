//! # Meltdown Latch
//!
//! Per-module breaker state.
//!
//! ## Security Design
//!
//! - Monotonic: once a module is tripped it stays tripped for the life of the
//!   latch. There is no reset operation.
//! - The first reason wins; later trips of the same module are no-ops.
//! - Reads take a shared lock so the check at the top of every `emit` never
//!   waits on other readers.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shared_types::MeltdownReason;
use std::collections::HashMap;

/// Why and when a module was tripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeltdownRecord {
    pub reason: MeltdownReason,
    pub tripped_at: DateTime<Utc>,
}

/// Monotonic `moduleName -> tripped` map.
#[derive(Debug, Default)]
pub struct MeltdownLatch {
    tripped: RwLock<HashMap<String, MeltdownRecord>>,
}

impl MeltdownLatch {
    /// Create an empty latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip `module_name`. Returns `true` if this call tripped it.
    pub fn trip(&self, module_name: &str, reason: MeltdownReason) -> bool {
        let mut tripped = self.tripped.write();
        if tripped.contains_key(module_name) {
            return false;
        }
        tripped.insert(
            module_name.to_string(),
            MeltdownRecord {
                reason,
                tripped_at: Utc::now(),
            },
        );
        true
    }

    /// Whether `module_name` is tripped.
    #[must_use]
    pub fn is_tripped(&self, module_name: &str) -> bool {
        self.tripped.read().contains_key(module_name)
    }

    /// The record for `module_name`, if tripped.
    #[must_use]
    pub fn record(&self, module_name: &str) -> Option<MeltdownRecord> {
        self.tripped.read().get(module_name).cloned()
    }

    /// Every tripped module, sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, MeltdownRecord)> {
        let mut all: Vec<_> = self
            .tripped
            .read()
            .iter()
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Number of tripped modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tripped.read().len()
    }

    /// No module tripped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tripped.read().is_empty()
    }
}
