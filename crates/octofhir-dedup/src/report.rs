//! Run report returned with every deduplicated bundle.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Counts for one resource type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStats {
    pub input: usize,
    /// Groups with more than one member
    pub groups: usize,
    /// Resources absorbed into a master
    pub merged: usize,
    pub excluded: usize,
}

impl TypeStats {
    pub fn output(&self) -> usize {
        self.input.saturating_sub(self.merged + self.excluded)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupReport {
    pub input_resources: usize,
    pub output_resources: usize,
    /// Handled types in pass order
    pub per_type: IndexMap<String, TypeStats>,
    /// Resources dropped for a dangling hard dependency
    pub dangling_removed: Vec<String>,
    pub pruned_references: usize,
}

impl DedupReport {
    pub fn stats_mut(&mut self, resource_type: &str) -> &mut TypeStats {
        self.per_type.entry(resource_type.to_string()).or_default()
    }

    pub fn merged(&self) -> usize {
        self.per_type.values().map(|s| s.merged).sum()
    }

    pub fn excluded(&self) -> usize {
        self.per_type.values().map(|s| s.excluded).sum()
    }

    /// True when the run changed nothing, as on an already deduplicated bundle.
    pub fn is_unchanged(&self) -> bool {
        self.merged() == 0
            && self.excluded() == 0
            && self.dangling_removed.is_empty()
            && self.pruned_references == 0
    }
}
