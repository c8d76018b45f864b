// ============================================================================
// Change Detection
// ============================================================================
//
// Detecting changes is two steps kept behind one call:
//   1. `compute_diff`            - pure comparison of two snapshots
//   2. `EntityState::after_diff` - pure state transition
// `Registry::changed_values` runs both and stores the new state, so reading
// the diff is also what moves FRESH entities to CHANGED and back.
//
// ============================================================================

use super::{EntityState, Registry};
use crate::core::{FieldMap, Result};
use crate::entity::{Accessor, EntityRef};
use crate::events::EventKind;
use log::debug;

/// Fields of `current` that are missing from `baseline` or not strictly
/// equal to their baseline value.
pub fn compute_diff(baseline: &FieldMap, current: FieldMap) -> FieldMap {
    current
        .into_iter()
        .filter(|(name, value)| {
            baseline
                .get(name)
                .is_none_or(|initial| !initial.strict_eq(value))
        })
        .collect()
}

impl<E: Accessor> Registry<E> {
    /// Takes the current field values as the new baseline and marks the
    /// entity FRESH.
    ///
    /// # Errors
    /// Returns `UnregisteredEntity` if the entity is not a member
    pub fn define_initial_values(&mut self, entity: &EntityRef<E>) -> Result<()> {
        let values = entity.fields()?;
        let entry = self.entry_mut(entity)?;
        entry.initial_values = values;
        entry.state = EntityState::Fresh;

        self.notify(entity, EventKind::Fresh)?;
        Ok(())
    }

    /// Fields changed since the baseline, applying the FRESH/CHANGED
    /// transitions as a side effect.
    ///
    /// # Errors
    /// Returns `UnregisteredEntity` if the entity is not a member
    pub fn changed_values(&mut self, entity: &EntityRef<E>) -> Result<FieldMap> {
        let baseline = &self.data(entity)?.initial_values;
        let diff = compute_diff(baseline, entity.fields()?);

        let entry = self.entry_mut(entity)?;
        let next = entry.state.after_diff(!diff.is_empty());
        if next != entry.state {
            debug!("{} moved from '{}' to '{}'", entity.id(), entry.state, next);
            entry.state = next;
        }

        Ok(diff)
    }

    /// Runs the change detector and reports whether the entity ended up
    /// CHANGED.
    pub fn is_changed(&mut self, entity: &EntityRef<E>) -> Result<bool> {
        self.changed_values(entity)?;
        Ok(self.state(entity) == EntityState::Changed)
    }
}
