//! Combat state transitions.
//!
//! Every mutation of a [`CombatState`] goes through the methods here, so
//! the lifecycle invariants (terminal `Ended`, monotonic round counter,
//! stable initiative order) have exactly one enforcement point.

use mesaforge_protocol::{EncounterId, EntryId};

use crate::{CombatError, CombatState, CombatStatus, EntryUpdate, InitiativeEntry};

/// What a call to [`CombatState::next_turn`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnAdvance {
    pub index: usize,
    pub round: u32,
    /// `true` when the pointer wrapped past the last entry and a new
    /// round began.
    pub wrapped: bool,
}

impl CombatState {
    /// Starts combat for an encounter.
    ///
    /// The order holds the participants in insertion order until
    /// [`begin_round`](Self::begin_round) sorts it; status is
    /// `RollingInitiative` and the round counter starts at 1.
    pub fn new(
        encounter_id: EncounterId,
        participants: Vec<InitiativeEntry>,
    ) -> Self {
        tracing::info!(
            %encounter_id,
            participants = participants.len(),
            "combat started"
        );
        Self {
            encounter_id,
            status: CombatStatus::RollingInitiative,
            round: 1,
            current_turn_index: 0,
            initiative_order: participants,
        }
    }

    /// Records an initiative value for one entry. Valid in any phase and
    /// never changes the status; the DM may overwrite a roll at will.
    pub fn set_initiative(
        &mut self,
        entry_id: &EntryId,
        value: i32,
    ) -> Result<(), CombatError> {
        let entry = self
            .initiative_order
            .iter_mut()
            .find(|e| &e.id == entry_id)
            .ok_or_else(|| CombatError::UnknownEntry(entry_id.clone()))?;
        entry.initiative = Some(value);
        tracing::debug!(entry_id = %entry.id, value, "initiative set");
        Ok(())
    }

    /// Locks the turn order and starts the first round.
    ///
    /// Requires every entry to have an initiative value. The sort is
    /// stable and descending, so tied entries keep their pre-existing
    /// relative order.
    pub fn begin_round(&mut self) -> Result<(), CombatError> {
        if self.status != CombatStatus::RollingInitiative {
            return Err(CombatError::InvalidTransition {
                status: self.status,
                action: "begin the round",
            });
        }
        if self.initiative_order.is_empty() {
            return Err(CombatError::EmptyOrder);
        }
        let missing = self
            .initiative_order
            .iter()
            .filter(|e| e.initiative.is_none())
            .count();
        if missing > 0 {
            return Err(CombatError::InitiativePending { missing });
        }

        self.initiative_order
            .sort_by(|a, b| b.initiative.cmp(&a.initiative));
        self.status = CombatStatus::InProgress;
        self.current_turn_index = 0;

        tracing::info!(
            encounter_id = %self.encounter_id,
            entries = self.initiative_order.len(),
            "initiative locked, round 1 begins"
        );
        Ok(())
    }

    /// Advances the turn pointer cyclically.
    ///
    /// Wrapping past the last entry increments the round. The entry
    /// whose turn begins gets its action budget restored.
    pub fn next_turn(&mut self) -> Result<TurnAdvance, CombatError> {
        if self.status != CombatStatus::InProgress {
            return Err(CombatError::InvalidTransition {
                status: self.status,
                action: "advance the turn",
            });
        }

        let len = self.initiative_order.len();
        let next = self.current_turn_index + 1;
        let wrapped = next >= len;
        self.current_turn_index = if wrapped { 0 } else { next };
        if wrapped {
            self.round += 1;
        }
        // InProgress implies a non-empty order: begin_round rejects an
        // empty one and entries are flagged defeated, never removed.
        if let Some(entry) =
            self.initiative_order.get_mut(self.current_turn_index)
        {
            entry.available_actions.reset();
        }

        tracing::debug!(
            index = self.current_turn_index,
            round = self.round,
            wrapped,
            "turn advanced"
        );
        Ok(TurnAdvance {
            index: self.current_turn_index,
            round: self.round,
            wrapped,
        })
    }

    /// Shallow-merges a partial update into one entry.
    pub fn update_entry(
        &mut self,
        entry_id: &EntryId,
        update: EntryUpdate,
    ) -> Result<(), CombatError> {
        let entry = self
            .initiative_order
            .iter_mut()
            .find(|e| &e.id == entry_id)
            .ok_or_else(|| CombatError::UnknownEntry(entry_id.clone()))?;

        if let Some(v) = update.initiative {
            entry.initiative = Some(v);
        }
        if let Some(v) = update.current_pv {
            entry.current_pv = Some(v);
        }
        if let Some(v) = update.max_pv {
            entry.max_pv = Some(v);
        }
        if let Some(v) = update.current_pm {
            entry.current_pm = Some(v);
        }
        if let Some(v) = update.max_pm {
            entry.max_pm = Some(v);
        }
        if let Some(v) = update.ca {
            entry.ca = Some(v);
        }
        if let Some(v) = update.is_defeated {
            entry.is_defeated = v;
        }
        if let Some(v) = update.conditions {
            entry.conditions = v;
        }
        if let Some(v) = update.available_actions {
            entry.available_actions.apply(v);
        }
        Ok(())
    }

    /// Ends combat. Valid from any phase, including before a single roll
    /// arrived. `Ended` is terminal; callers drop the state afterwards.
    pub fn end_combat(&mut self) {
        tracing::info!(
            encounter_id = %self.encounter_id,
            round = self.round,
            "combat ended"
        );
        self.status = CombatStatus::Ended;
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use mesaforge_protocol::EntryKind;

    fn entry(id: &str, name: &str) -> InitiativeEntry {
        InitiativeEntry::new(id, name, EntryKind::Player, format!("c-{id}"))
    }

    fn rolled_state() -> CombatState {
        let mut state = CombatState::new(
            EncounterId::from("enc1"),
            vec![entry("a", "Anya"), entry("b", "Bram"), entry("c", "Cleo")],
        );
        state.set_initiative(&EntryId::from("a"), 15).unwrap();
        state.set_initiative(&EntryId::from("b"), 20).unwrap();
        state.set_initiative(&EntryId::from("c"), 10).unwrap();
        state
    }

    #[test]
    fn test_new_starts_rolling_with_insertion_order() {
        let state = CombatState::new(
            EncounterId::from("enc1"),
            vec![entry("a", "Anya"), entry("b", "Bram")],
        );
        assert_eq!(state.status, CombatStatus::RollingInitiative);
        assert_eq!(state.round, 1);
        assert_eq!(state.initiative_order[0].id, EntryId::from("a"));
        assert!(state.current_entry().is_none(), "no turn while rolling");
    }

    #[test]
    fn test_set_initiative_unknown_entry_fails() {
        let mut state = rolled_state();
        let err = state
            .set_initiative(&EntryId::from("ghost"), 12)
            .unwrap_err();
        assert!(matches!(err, CombatError::UnknownEntry(_)));
    }

    #[test]
    fn test_begin_round_sorts_descending() {
        let mut state = rolled_state();
        state.begin_round().unwrap();

        let ids: Vec<_> = state
            .initiative_order
            .iter()
            .map(|e| e.id.clone())
            .collect();
        assert_eq!(
            ids,
            vec![EntryId::from("b"), EntryId::from("a"), EntryId::from("c")]
        );
        assert_eq!(state.status, CombatStatus::InProgress);
        assert_eq!(state.current_turn_index, 0);
    }

    #[test]
    fn test_begin_round_tie_keeps_prior_order() {
        let mut state = CombatState::new(
            EncounterId::from("enc1"),
            vec![entry("a", "Anya"), entry("b", "Bram"), entry("c", "Cleo")],
        );
        state.set_initiative(&EntryId::from("a"), 12).unwrap();
        state.set_initiative(&EntryId::from("b"), 12).unwrap();
        state.set_initiative(&EntryId::from("c"), 18).unwrap();

        state.begin_round().unwrap();

        let ids: Vec<_> = state
            .initiative_order
            .iter()
            .map(|e| e.id.clone())
            .collect();
        // c first, then the a/b tie in insertion order.
        assert_eq!(
            ids,
            vec![EntryId::from("c"), EntryId::from("a"), EntryId::from("b")]
        );
    }

    #[test]
    fn test_begin_round_with_missing_rolls_fails() {
        let mut state = CombatState::new(
            EncounterId::from("enc1"),
            vec![entry("a", "Anya"), entry("b", "Bram")],
        );
        state.set_initiative(&EntryId::from("a"), 15).unwrap();

        let err = state.begin_round().unwrap_err();
        assert!(matches!(err, CombatError::InitiativePending { missing: 1 }));
        assert_eq!(state.status, CombatStatus::RollingInitiative);
    }

    #[test]
    fn test_begin_round_with_empty_order_fails() {
        let mut state =
            CombatState::new(EncounterId::from("enc1"), Vec::new());
        let err = state.begin_round().unwrap_err();
        assert!(matches!(err, CombatError::EmptyOrder));
        assert_eq!(state.status, CombatStatus::RollingInitiative);
    }

    #[test]
    fn test_begin_round_twice_fails() {
        let mut state = rolled_state();
        state.begin_round().unwrap();
        let err = state.begin_round().unwrap_err();
        assert!(matches!(err, CombatError::InvalidTransition { .. }));
    }

    #[test]
    fn test_next_turn_advances_and_wraps_with_round_increment() {
        let mut state = rolled_state();
        state.begin_round().unwrap();

        let a1 = state.next_turn().unwrap();
        assert_eq!((a1.index, a1.round, a1.wrapped), (1, 1, false));

        let a2 = state.next_turn().unwrap();
        assert_eq!((a2.index, a2.round, a2.wrapped), (2, 1, false));

        let a3 = state.next_turn().unwrap();
        assert_eq!((a3.index, a3.round, a3.wrapped), (0, 2, true));
    }

    #[test]
    fn test_next_turn_resets_action_budget() {
        let mut state = rolled_state();
        state.begin_round().unwrap();

        // Spend the second entry's actions before its turn comes up.
        state.initiative_order[1].available_actions.standard = 0;
        state.next_turn().unwrap();

        assert_eq!(state.initiative_order[1].available_actions.standard, 1);
    }

    #[test]
    fn test_next_turn_while_rolling_fails() {
        let mut state = rolled_state();
        let err = state.next_turn().unwrap_err();
        assert!(matches!(
            err,
            CombatError::InvalidTransition {
                status: CombatStatus::RollingInitiative,
                ..
            }
        ));
    }

    #[test]
    fn test_update_entry_shallow_merge() {
        let mut state = rolled_state();
        state
            .update_entry(
                &EntryId::from("a"),
                EntryUpdate {
                    current_pv: Some(-5),
                    conditions: Some(vec!["prone".into()]),
                    ..Default::default()
                },
            )
            .unwrap();

        let a = state.entry(&EntryId::from("a")).unwrap();
        assert_eq!(a.current_pv, Some(-5));
        assert_eq!(a.conditions, vec!["prone".to_string()]);
        assert!(!a.is_defeated, "negative health must not flag defeat");
        assert_eq!(a.initiative, Some(15), "untouched fields survive");
    }

    #[test]
    fn test_end_combat_from_rolling_initiative() {
        let mut state = CombatState::new(
            EncounterId::from("enc1"),
            vec![entry("a", "Anya")],
        );
        state.end_combat();
        assert_eq!(state.status, CombatStatus::Ended);
        assert!(state.current_entry().is_none());
    }

    #[test]
    fn test_next_turn_after_end_fails() {
        let mut state = rolled_state();
        state.begin_round().unwrap();
        state.end_combat();
        assert!(state.next_turn().is_err());
    }
}
