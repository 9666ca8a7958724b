//! Presence tracking for the target display

use crate::devices::DeviceIdSet;

/// Outcome of comparing two consecutive device snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    pub previous_presence: bool,
    pub current_presence: bool,
    /// Identifiers present now but not in the previous snapshot
    pub added: DeviceIdSet,
    /// Identifiers present in the previous snapshot but not now
    pub removed: DeviceIdSet,
}

impl TransitionEvent {
    /// Whether the target appeared or disappeared
    pub fn is_transition(&self) -> bool {
        self.previous_presence != self.current_presence
    }
}

/// Last observed device set and target presence.
///
/// `update` always replaces the device set, but the committed presence only
/// moves when [`PresenceTracker::commit`] is called, after the transition
/// has been acted on. Until then every update keeps reporting the edge.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    target_id: String,
    previous_ids: DeviceIdSet,
    previous_presence: bool,
}

impl PresenceTracker {
    /// Seed the tracker from the startup snapshot
    pub fn new(target_id: impl Into<String>, initial_ids: DeviceIdSet) -> Self {
        let target_id = target_id.into();
        let previous_presence = initial_ids.contains(&target_id);
        Self {
            target_id,
            previous_ids: initial_ids,
            previous_presence,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Committed presence of the target
    pub fn is_present(&self) -> bool {
        self.previous_presence
    }

    /// Device set of the latest snapshot
    pub fn previous_ids(&self) -> &DeviceIdSet {
        &self.previous_ids
    }

    /// Diff `current_ids` against the previous snapshot and make it the new
    /// previous snapshot.
    pub fn update(&mut self, current_ids: DeviceIdSet) -> TransitionEvent {
        let added = current_ids.difference(&self.previous_ids).cloned().collect();
        let removed = self.previous_ids.difference(&current_ids).cloned().collect();
        let current_presence = current_ids.contains(&self.target_id);

        self.previous_ids = current_ids;

        TransitionEvent {
            previous_presence: self.previous_presence,
            current_presence,
            added,
            removed,
        }
    }

    /// Record that `event` has been handled
    pub fn commit(&mut self, event: &TransitionEvent) {
        self.previous_presence = event.current_presence;
    }
}
