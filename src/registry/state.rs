// ============================================================================
// Entity Lifecycle States
// ============================================================================
//
// State transitions driven by the change detector:
// ```text
//   FRESH ──diff found──> CHANGED
//     ^                      │
//     │                 diff gone
// define_initial_values      │
//     │                      v
//   (any) <──────────────  UNKNOWN
// ```
// NEW and UNKNOWN are never promoted by diffing; only
// `define_initial_values` moves an entity to FRESH.
//
// ============================================================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityState {
    /// Registered, never synchronized with the database
    New,

    /// Baseline established, no known differences
    Fresh,

    /// Differences detected since the baseline
    Changed,

    /// Diff status not evaluated yet (default on registration)
    #[default]
    Unknown,

    /// Not a member of the registry; never stored
    Unregistered,
}

impl EntityState {
    /// Pure transition applied after a diff has been computed.
    pub fn after_diff(self, has_changes: bool) -> EntityState {
        match (self, has_changes) {
            (EntityState::Fresh, true) => EntityState::Changed,
            (EntityState::Changed, false) => EntityState::Unknown,
            (state, _) => state,
        }
    }

    /// Whether this state may be held by a stored entry
    pub fn is_storable(&self) -> bool {
        !matches!(self, EntityState::Unregistered)
    }
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityState::New => write!(f, "new"),
            EntityState::Fresh => write!(f, "fresh"),
            EntityState::Changed => write!(f, "changed"),
            EntityState::Unknown => write!(f, "unknown"),
            EntityState::Unregistered => write!(f, "unregistered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_and_changed_cycle() {
        assert_eq!(EntityState::Fresh.after_diff(true), EntityState::Changed);
        assert_eq!(EntityState::Fresh.after_diff(false), EntityState::Fresh);
        assert_eq!(EntityState::Changed.after_diff(true), EntityState::Changed);
        // reverting a change does not restore FRESH
        assert_eq!(EntityState::Changed.after_diff(false), EntityState::Unknown);
    }

    #[test]
    fn test_new_and_unknown_are_not_promoted() {
        for has_changes in [true, false] {
            assert_eq!(EntityState::New.after_diff(has_changes), EntityState::New);
            assert_eq!(EntityState::Unknown.after_diff(has_changes), EntityState::Unknown);
        }
    }

    #[test]
    fn test_storable_states() {
        assert!(EntityState::New.is_storable());
        assert!(!EntityState::Unregistered.is_storable());
        assert_eq!(EntityState::default(), EntityState::Unknown);
        assert_eq!(EntityState::Changed.to_string(), "changed");
    }
}
