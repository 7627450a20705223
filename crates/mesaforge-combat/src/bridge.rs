//! The DM-side sync bridge.
//!
//! Sits between the DM's combat state and the relay. DM actions go
//! through the methods that return broadcast events; events arriving
//! from the relay go through [`DmBridge::handle_event`]. The bridge
//! never owns the state: callers pass it in, which keeps the bridge
//! trivially testable and the ownership story flat.
//!
//! Broadcasts are fire and forget. There are no acks and no retries; a
//! player that missed something asks for `combat:sync:request` and gets
//! the current phase replayed.

use mesaforge_protocol::{EncounterId, EntryId, EntryKind, MesaId, TableEvent};

use crate::{
    CombatError, CombatState, CombatStatus, EntryUpdate, InitiativeEntry,
};

/// Maps relay events to state transitions and transitions to broadcasts
/// for one table session.
#[derive(Debug, Clone)]
pub struct DmBridge {
    mesa_id: MesaId,
}

impl DmBridge {
    pub fn new(mesa_id: impl Into<MesaId>) -> Self {
        Self {
            mesa_id: mesa_id.into(),
        }
    }

    pub fn mesa_id(&self) -> &MesaId {
        &self.mesa_id
    }

    // -- DM actions ---------------------------------------------------------

    /// Starts combat, replacing any previous state, and asks the table
    /// for initiative rolls.
    pub fn start_combat(
        &self,
        slot: &mut Option<CombatState>,
        encounter_id: EncounterId,
        participants: Vec<InitiativeEntry>,
    ) -> Vec<TableEvent> {
        if let Some(old) = slot.take() {
            tracing::warn!(
                encounter_id = %old.encounter_id,
                "starting combat over an existing encounter, dropping it"
            );
        }
        *slot = Some(CombatState::new(encounter_id.clone(), participants));

        vec![
            TableEvent::CombatStart {
                mesa_id: self.mesa_id.clone(),
                encounter_id: encounter_id.clone(),
            },
            TableEvent::InitiativeRequest {
                mesa_id: self.mesa_id.clone(),
                encounter_id,
            },
        ]
    }

    /// Locks initiative and announces the first turn.
    pub fn begin_round(
        &self,
        state: &mut CombatState,
    ) -> Result<Vec<TableEvent>, CombatError> {
        state.begin_round()?;
        Ok(self.turn_change(state).into_iter().collect())
    }

    /// Advances the turn and announces the new one.
    pub fn advance_turn(
        &self,
        state: &mut CombatState,
    ) -> Result<Vec<TableEvent>, CombatError> {
        state.next_turn()?;
        Ok(self.turn_change(state).into_iter().collect())
    }

    /// Ends combat from any phase and drops the state. A no-op when no
    /// combat is running.
    pub fn end_combat(
        &self,
        slot: &mut Option<CombatState>,
    ) -> Vec<TableEvent> {
        let Some(mut state) = slot.take() else {
            return Vec::new();
        };
        state.end_combat();
        vec![TableEvent::CombatEnd {
            mesa_id: self.mesa_id.clone(),
            encounter_id: state.encounter_id,
        }]
    }

    /// DM sets an entry's initiative directly (a player who rolled at
    /// the table, or an enemy). Player entries get the change pushed to
    /// their client.
    pub fn set_entry_initiative(
        &self,
        state: &mut CombatState,
        entry_id: &EntryId,
        value: i32,
    ) -> Result<Vec<TableEvent>, CombatError> {
        state.set_initiative(entry_id, value)?;
        // Known to exist: set_initiative just succeeded.
        let entry = state.entry(entry_id).unwrap();
        if entry.kind != EntryKind::Player {
            return Ok(Vec::new());
        }
        Ok(vec![TableEvent::InitiativeUpdate {
            mesa_id: self.mesa_id.clone(),
            character_id: entry.source_id.clone(),
            initiative: value,
        }])
    }

    /// DM edits an entry's status conditions.
    pub fn set_conditions(
        &self,
        state: &mut CombatState,
        entry_id: &EntryId,
        conditions: Vec<String>,
    ) -> Result<Vec<TableEvent>, CombatError> {
        state.update_entry(
            entry_id,
            EntryUpdate {
                conditions: Some(conditions.clone()),
                ..Default::default()
            },
        )?;
        let entry = state.entry(entry_id).unwrap();
        if entry.kind != EntryKind::Player {
            return Ok(Vec::new());
        }
        Ok(vec![TableEvent::ConditionsUpdate {
            mesa_id: self.mesa_id.clone(),
            character_id: entry.source_id.clone(),
            conditions,
        }])
    }

    // -- Relay inbound ------------------------------------------------------

    /// Feeds one relayed event into the combat state.
    ///
    /// Anything that does not fit the current phase, names an unknown
    /// character, or belongs to another mesa is dropped with a debug
    /// log. Nothing inbound is ever an error: the sender may be stale,
    /// confused, or racing a broadcast, and the fix for all three is the
    /// same sync request they will issue on their own.
    pub fn handle_event(
        &self,
        slot: &mut Option<CombatState>,
        event: &TableEvent,
    ) -> Vec<TableEvent> {
        if event.mesa_id() != &self.mesa_id {
            tracing::debug!(
                event = event.name(),
                theirs = %event.mesa_id(),
                ours = %self.mesa_id,
                "event for another mesa, ignoring"
            );
            return Vec::new();
        }

        match event {
            TableEvent::InitiativeRoll {
                character_id,
                initiative,
                ..
            } => {
                let Some(state) = slot.as_mut() else {
                    tracing::debug!("initiative roll with no combat, ignoring");
                    return Vec::new();
                };
                match state.player_entry_by_source_mut(character_id) {
                    Some(entry) => {
                        entry.initiative = Some(*initiative);
                        tracing::debug!(
                            %character_id,
                            initiative,
                            "player initiative recorded"
                        );
                    }
                    None => tracing::debug!(
                        %character_id,
                        "initiative roll from unknown character, ignoring"
                    ),
                }
                Vec::new()
            }

            TableEvent::TurnEnd { character_id, .. } => {
                let Some(state) = slot.as_mut() else {
                    tracing::debug!("turn end with no combat, ignoring");
                    return Vec::new();
                };
                if state.status != CombatStatus::InProgress {
                    tracing::debug!(
                        status = %state.status,
                        "turn end outside an active round, ignoring"
                    );
                    return Vec::new();
                }
                if state.player_entry_by_source(character_id).is_none() {
                    tracing::debug!(
                        %character_id,
                        "turn end from unknown character, ignoring"
                    );
                    return Vec::new();
                }
                // Any member may end the current turn (the table often
                // ends an absent player's turn for them). Racing turn
                // ends are all applied; last processed wins.
                // InProgress was just checked, next_turn cannot fail.
                let _ = state.next_turn();
                self.turn_change(state).into_iter().collect()
            }

            TableEvent::ActionUpdate {
                character_id,
                available_actions,
                ..
            } => {
                self.patch_player(
                    slot,
                    character_id,
                    EntryUpdate {
                        available_actions: Some(*available_actions),
                        ..Default::default()
                    },
                );
                Vec::new()
            }

            TableEvent::HealthUpdate {
                character_id,
                health,
                ..
            } => {
                // Health flows through verbatim; the defeated flag is a
                // separate DM decision.
                self.patch_player(
                    slot,
                    character_id,
                    EntryUpdate {
                        current_pv: Some(*health),
                        ..Default::default()
                    },
                );
                Vec::new()
            }

            TableEvent::SyncRequest { .. } => self.sync_reply(slot.as_ref()),

            other => {
                tracing::debug!(
                    event = other.name(),
                    "no DM handler for event, ignoring"
                );
                Vec::new()
            }
        }
    }

    /// Replays the current combat phase for a late joiner. Read-only
    /// and idempotent: asking twice gets the same answer twice.
    fn sync_reply(&self, state: Option<&CombatState>) -> Vec<TableEvent> {
        let Some(state) = state else {
            tracing::debug!("sync request with no combat, nothing to replay");
            return Vec::new();
        };
        match state.status {
            CombatStatus::InProgress => {
                self.turn_change(state).into_iter().collect()
            }
            CombatStatus::RollingInitiative => {
                vec![TableEvent::InitiativeRequest {
                    mesa_id: self.mesa_id.clone(),
                    encounter_id: state.encounter_id.clone(),
                }]
            }
            CombatStatus::Ended => Vec::new(),
        }
    }

    fn turn_change(&self, state: &CombatState) -> Option<TableEvent> {
        let entry = state.current_entry()?;
        Some(TableEvent::TurnChange {
            mesa_id: self.mesa_id.clone(),
            current_entry: entry.turn_entry(),
            round: state.round,
        })
    }

    fn patch_player(
        &self,
        slot: &mut Option<CombatState>,
        character_id: &mesaforge_protocol::CharacterId,
        update: EntryUpdate,
    ) {
        let Some(state) = slot.as_mut() else {
            tracing::debug!(%character_id, "update with no combat, ignoring");
            return;
        };
        let Some(entry) = state.player_entry_by_source_mut(character_id)
        else {
            tracing::debug!(
                %character_id,
                "update for unknown character, ignoring"
            );
            return;
        };
        let entry_id = entry.id.clone();
        // Entry was just found by id.
        let _ = state.update_entry(&entry_id, update);
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use mesaforge_protocol::{CharacterId, TurnActions, TurnEntry};

    fn bridge() -> DmBridge {
        DmBridge::new("t1")
    }

    fn participants() -> Vec<InitiativeEntry> {
        vec![
            InitiativeEntry::new("a", "Anya", EntryKind::Player, "c-a"),
            InitiativeEntry::new("b", "Bram", EntryKind::Player, "c-b"),
            InitiativeEntry::new("g", "Goblin", EntryKind::Enemy, "bestiary-1"),
        ]
    }

    /// Combat started and all initiative set, first round begun.
    fn running() -> (DmBridge, Option<CombatState>) {
        let bridge = bridge();
        let mut slot = None;
        bridge.start_combat(
            &mut slot,
            EncounterId::from("enc1"),
            participants(),
        );
        {
            let state = slot.as_mut().unwrap();
            state.set_initiative(&EntryId::from("a"), 15).unwrap();
            state.set_initiative(&EntryId::from("b"), 20).unwrap();
            state.set_initiative(&EntryId::from("g"), 10).unwrap();
        }
        let events = bridge.begin_round(slot.as_mut().unwrap()).unwrap();
        assert_eq!(events.len(), 1);
        (bridge, slot)
    }

    fn current_source(slot: &Option<CombatState>) -> CharacterId {
        slot.as_ref()
            .unwrap()
            .current_entry()
            .unwrap()
            .source_id
            .clone()
    }

    #[test]
    fn test_start_combat_broadcasts_start_then_initiative_request() {
        let bridge = bridge();
        let mut slot = None;

        let events = bridge.start_combat(
            &mut slot,
            EncounterId::from("enc1"),
            participants(),
        );

        assert!(matches!(events[0], TableEvent::CombatStart { .. }));
        assert!(matches!(events[1], TableEvent::InitiativeRequest { .. }));
        assert_eq!(
            slot.unwrap().status,
            CombatStatus::RollingInitiative
        );
    }

    #[test]
    fn test_begin_round_broadcasts_turn_change_for_highest_roll() {
        let (_, slot) = running();
        let state = slot.as_ref().unwrap();
        assert_eq!(state.current_entry().unwrap().name, "Bram");
    }

    #[test]
    fn test_turn_end_from_current_player_advances() {
        let (bridge, mut slot) = running();
        let current = current_source(&slot);

        let events = bridge.handle_event(
            &mut slot,
            &TableEvent::TurnEnd {
                mesa_id: MesaId::from("t1"),
                character_id: current,
            },
        );

        match &events[..] {
            [TableEvent::TurnChange { current_entry, round, .. }] => {
                assert_eq!(current_entry.name, "Anya");
                assert_eq!(*round, 1);
            }
            other => panic!("expected one turn:change, got {other:?}"),
        }
    }

    #[test]
    fn test_turn_end_from_unknown_character_is_ignored() {
        let (bridge, mut slot) = running();
        let before = slot.clone();

        let events = bridge.handle_event(
            &mut slot,
            &TableEvent::TurnEnd {
                mesa_id: MesaId::from("t1"),
                character_id: CharacterId::from("nobody"),
            },
        );

        assert!(events.is_empty());
        assert_eq!(slot, before, "state must be untouched");
    }

    #[test]
    fn test_turn_end_from_noncurrent_player_advances() {
        let (bridge, mut slot) = running();
        // Bram's turn; Anya ends it on his behalf.
        let events = bridge.handle_event(
            &mut slot,
            &TableEvent::TurnEnd {
                mesa_id: MesaId::from("t1"),
                character_id: CharacterId::from("c-a"),
            },
        );
        assert!(matches!(events[..], [TableEvent::TurnChange { .. }]));
        assert_eq!(slot.unwrap().current_turn_index, 1);
    }

    #[test]
    fn test_racing_turn_ends_both_advance() {
        let (bridge, mut slot) = running();
        // Both players end the turn at once; each arrival advances,
        // last processed wins.
        for character in ["c-b", "c-a"] {
            bridge.handle_event(
                &mut slot,
                &TableEvent::TurnEnd {
                    mesa_id: MesaId::from("t1"),
                    character_id: CharacterId::from(character),
                },
            );
        }
        assert_eq!(slot.unwrap().current_turn_index, 2);
    }

    #[test]
    fn test_initiative_roll_records_value() {
        let bridge = bridge();
        let mut slot = None;
        bridge.start_combat(
            &mut slot,
            EncounterId::from("enc1"),
            participants(),
        );

        bridge.handle_event(
            &mut slot,
            &TableEvent::InitiativeRoll {
                mesa_id: MesaId::from("t1"),
                character_id: CharacterId::from("c-a"),
                character_name: "Anya".into(),
                initiative: 17,
            },
        );

        let state = slot.as_ref().unwrap();
        assert_eq!(
            state.entry(&EntryId::from("a")).unwrap().initiative,
            Some(17)
        );
    }

    #[test]
    fn test_health_update_sets_pv_without_defeat() {
        let (bridge, mut slot) = running();

        bridge.handle_event(
            &mut slot,
            &TableEvent::HealthUpdate {
                mesa_id: MesaId::from("t1"),
                character_id: CharacterId::from("c-a"),
                health: -5,
            },
        );

        let state = slot.as_ref().unwrap();
        let anya = state.entry(&EntryId::from("a")).unwrap();
        assert_eq!(anya.current_pv, Some(-5));
        assert!(!anya.is_defeated);
    }

    #[test]
    fn test_action_update_applies_to_wire_counters_only() {
        let (bridge, mut slot) = running();

        bridge.handle_event(
            &mut slot,
            &TableEvent::ActionUpdate {
                mesa_id: MesaId::from("t1"),
                character_id: CharacterId::from("c-b"),
                available_actions: TurnActions {
                    standard: 0,
                    movement: 0,
                    free: 1,
                },
            },
        );

        let state = slot.as_ref().unwrap();
        let bram = state.entry(&EntryId::from("b")).unwrap();
        assert_eq!(bram.available_actions.standard, 0);
        assert_eq!(bram.available_actions.reaction, 1);
    }

    #[test]
    fn test_sync_request_in_progress_replays_turn_change() {
        let (bridge, mut slot) = running();
        let request = TableEvent::SyncRequest {
            mesa_id: MesaId::from("t1"),
        };

        let first = bridge.handle_event(&mut slot, &request);
        let second = bridge.handle_event(&mut slot, &request);

        assert_eq!(first, second, "sync replies must be idempotent");
        match &first[..] {
            [TableEvent::TurnChange { current_entry, .. }] => {
                assert_eq!(current_entry.name, "Bram");
            }
            other => panic!("expected turn:change, got {other:?}"),
        }
    }

    #[test]
    fn test_sync_request_while_rolling_replays_initiative_request() {
        let bridge = bridge();
        let mut slot = None;
        bridge.start_combat(
            &mut slot,
            EncounterId::from("enc1"),
            participants(),
        );

        let events = bridge.handle_event(
            &mut slot,
            &TableEvent::SyncRequest {
                mesa_id: MesaId::from("t1"),
            },
        );

        assert!(matches!(
            events[..],
            [TableEvent::InitiativeRequest { .. }]
        ));
    }

    #[test]
    fn test_sync_request_with_no_combat_yields_nothing() {
        let bridge = bridge();
        let mut slot = None;
        let events = bridge.handle_event(
            &mut slot,
            &TableEvent::SyncRequest {
                mesa_id: MesaId::from("t1"),
            },
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_wrong_mesa_event_is_ignored() {
        let (bridge, mut slot) = running();
        let before = slot.clone();

        let events = bridge.handle_event(
            &mut slot,
            &TableEvent::SyncRequest {
                mesa_id: MesaId::from("other-table"),
            },
        );

        assert!(events.is_empty());
        assert_eq!(slot, before);
    }

    #[test]
    fn test_end_combat_from_rolling_broadcasts_end_only() {
        let bridge = bridge();
        let mut slot = None;
        bridge.start_combat(
            &mut slot,
            EncounterId::from("enc1"),
            participants(),
        );

        let events = bridge.end_combat(&mut slot);

        assert!(matches!(events[..], [TableEvent::CombatEnd { .. }]));
        assert!(slot.is_none(), "state is dropped on end");
    }

    #[test]
    fn test_end_combat_without_combat_is_noop() {
        let bridge = bridge();
        let mut slot = None;
        assert!(bridge.end_combat(&mut slot).is_empty());
    }

    #[test]
    fn test_set_entry_initiative_broadcasts_for_players_only() {
        let bridge = bridge();
        let mut slot = None;
        bridge.start_combat(
            &mut slot,
            EncounterId::from("enc1"),
            participants(),
        );
        let state = slot.as_mut().unwrap();

        let player_events = bridge
            .set_entry_initiative(state, &EntryId::from("a"), 14)
            .unwrap();
        let enemy_events = bridge
            .set_entry_initiative(state, &EntryId::from("g"), 9)
            .unwrap();

        assert!(matches!(
            player_events[..],
            [TableEvent::InitiativeUpdate { initiative: 14, .. }]
        ));
        assert!(enemy_events.is_empty());
    }

    #[test]
    fn test_set_conditions_broadcasts_for_player() {
        let (bridge, mut slot) = running();
        let state = slot.as_mut().unwrap();

        let events = bridge
            .set_conditions(
                state,
                &EntryId::from("a"),
                vec!["stunned".into()],
            )
            .unwrap();

        match &events[..] {
            [TableEvent::ConditionsUpdate { character_id, conditions, .. }] => {
                assert_eq!(character_id, &CharacterId::from("c-a"));
                assert_eq!(conditions, &vec!["stunned".to_string()]);
            }
            other => panic!("expected conditions:update, got {other:?}"),
        }
    }

    #[test]
    fn test_turn_entry_shape_on_turn_change() {
        let (bridge, mut slot) = running();
        let current = current_source(&slot);

        let events = bridge.handle_event(
            &mut slot,
            &TableEvent::TurnEnd {
                mesa_id: MesaId::from("t1"),
                character_id: current,
            },
        );

        if let [TableEvent::TurnChange { current_entry, .. }] = &events[..] {
            let TurnEntry { id, source_id, .. } = current_entry;
            assert_eq!(id, &EntryId::from("a"));
            assert_eq!(source_id, &CharacterId::from("c-a"));
        } else {
            panic!("expected turn:change");
        }
    }
}
