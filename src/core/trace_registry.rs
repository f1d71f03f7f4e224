use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{ViewerError, ViewerResult};

/// Largest index a renderer trace list can address.
const MAX_TRACE_INDEX: usize = isize::MAX as usize;

/// Result of registering a trace label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceAllocation {
    pub label: String,
    pub index: usize,
    /// Index previously held by the same label when the add replaced an
    /// existing registration. The renderer trace at that index is not freed
    /// by the registry.
    pub replaced_index: Option<usize>,
}

/// Result of removing a trace label.
///
/// `shifted` holds the new index of every entry that moved down by one, in
/// render order, so callers can mirror a single `delete_trace(removed_index)`
/// on the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRemoval {
    pub label: String,
    pub removed_index: usize,
    pub shifted: IndexMap<String, usize>,
}

/// Serializable copy of registry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRegistrySnapshot {
    pub start_index: usize,
    pub next_index: usize,
    pub entries: IndexMap<String, usize>,
}

/// Label to render-position mapping mirroring an append/delete-shift trace list.
///
/// Indices below `start_index` are reserved for background traces the
/// registry never touches. While labels are only added once, the held indices
/// are exactly `start_index..start_index + len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceIndexRegistry {
    start_index: usize,
    next_index: usize,
    entries: IndexMap<String, usize>,
}

impl Default for TraceIndexRegistry {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TraceIndexRegistry {
    #[must_use]
    pub fn new(start_index: usize) -> Self {
        Self {
            start_index,
            next_index: start_index,
            entries: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    #[must_use]
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Registers `label` at the next free position.
    ///
    /// Re-adding a registered label overwrites it with a freshly allocated
    /// index; the old index is reported in `replaced_index`.
    pub fn add_trace(&mut self, label: impl Into<String>) -> TraceAllocation {
        let label = label.into();
        let index = self.next_index;
        self.next_index += 1;
        let replaced_index = self.entries.insert(label.clone(), index);
        if let Some(previous) = replaced_index {
            warn!(
                label = %label,
                previous_index = previous,
                index,
                "trace label already registered; replacing registration"
            );
        } else {
            trace!(label = %label, index, "registered trace");
        }
        TraceAllocation {
            label,
            index,
            replaced_index,
        }
    }

    /// Registers `label`, rejecting labels that are already present.
    pub fn try_add_trace(&mut self, label: impl Into<String>) -> ViewerResult<usize> {
        let label = label.into();
        if self.entries.contains_key(&label) {
            return Err(ViewerError::DuplicateRegistration { label });
        }
        Ok(self.add_trace(label).index)
    }

    /// Unregisters `label` and shifts every later entry down by one.
    pub fn remove_trace(&mut self, label: &str) -> ViewerResult<TraceRemoval> {
        let removed_index = self
            .entries
            .shift_remove(label)
            .ok_or_else(|| ViewerError::not_found(label))?;

        let mut shifted = Vec::new();
        for (entry_label, index) in &mut self.entries {
            if *index > removed_index {
                *index -= 1;
                shifted.push((entry_label.clone(), *index));
            }
        }
        shifted.sort_by_key(|(_, index)| *index);
        self.next_index -= 1;

        debug!(
            label,
            removed_index,
            shifted = shifted.len(),
            "removed trace"
        );
        Ok(TraceRemoval {
            label: label.to_owned(),
            removed_index,
            shifted: shifted.into_iter().collect(),
        })
    }

    pub fn get_trace_index(&self, label: &str) -> ViewerResult<usize> {
        self.entries
            .get(label)
            .copied()
            .ok_or_else(|| ViewerError::not_found(label))
    }

    #[must_use]
    pub fn has_trace(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    /// Owned copy of the label mapping in registration order.
    #[must_use]
    pub fn all_traces(&self) -> IndexMap<String, usize> {
        self.entries.clone()
    }

    /// Labels ordered by their current render position.
    #[must_use]
    pub fn labels_in_render_order(&self) -> Vec<&str> {
        let mut labels: Vec<(&str, usize)> = self
            .entries
            .iter()
            .map(|(label, index)| (label.as_str(), *index))
            .collect();
        labels.sort_by_key(|(_, index)| *index);
        labels.into_iter().map(|(label, _)| label).collect()
    }

    /// Label holding the highest index among entries accepted by `filter`.
    pub fn most_recent<F>(&self, mut filter: F) -> Option<&str>
    where
        F: FnMut(&str) -> bool,
    {
        self.entries
            .iter()
            .filter(|(label, _)| filter(label))
            .max_by_key(|(_, index)| **index)
            .map(|(label, _)| label.as_str())
    }

    pub fn clear(&mut self) {
        debug!(cleared = self.entries.len(), "cleared trace registry");
        self.entries.clear();
        self.next_index = self.start_index;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> TraceRegistrySnapshot {
        TraceRegistrySnapshot {
            start_index: self.start_index,
            next_index: self.next_index,
            entries: self.entries.clone(),
        }
    }

    /// Restores a registry, rejecting snapshots whose indices fall outside
    /// `start_index..next_index` or collide.
    pub fn from_snapshot(snapshot: TraceRegistrySnapshot) -> ViewerResult<Self> {
        if snapshot.next_index < snapshot.start_index {
            return Err(ViewerError::InvalidData(format!(
                "next index {} is below start index {}",
                snapshot.next_index, snapshot.start_index
            )));
        }
        if snapshot.next_index > MAX_TRACE_INDEX {
            return Err(ViewerError::InvalidData(format!(
                "next index {} exceeds the largest trace index {MAX_TRACE_INDEX}",
                snapshot.next_index
            )));
        }
        let mut seen = HashSet::with_capacity(snapshot.entries.len());
        for (label, &index) in &snapshot.entries {
            if !(snapshot.start_index..snapshot.next_index).contains(&index) {
                return Err(ViewerError::InvalidData(format!(
                    "trace `{label}` index {index} is outside {}..{}",
                    snapshot.start_index, snapshot.next_index
                )));
            }
            if !seen.insert(index) {
                return Err(ViewerError::InvalidData(format!(
                    "trace `{label}` reuses index {index}"
                )));
            }
        }
        Ok(Self {
            start_index: snapshot.start_index,
            next_index: snapshot.next_index,
            entries: snapshot.entries,
        })
    }
}
