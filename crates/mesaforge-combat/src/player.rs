//! The player-side combat client.
//!
//! Holds the little a player's UI needs: whether combat is on, whose
//! turn it is, and what the DM pushed onto this character. All of it is
//! derived from broadcast events; none of it is authoritative, and a
//! reconnect rebuilds it from one `combat:sync:request`.

use mesaforge_protocol::{CharacterId, MesaId, TableEvent, TurnActions};

/// Per-player derived combat view for one character at one table.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerCombatClient {
    mesa_id: MesaId,
    character_id: CharacterId,
    pub combat_active: bool,
    /// Set by `initiative:request`, cleared when this player rolls.
    pub initiative_requested: bool,
    pub is_my_turn: bool,
    pub current_turn_name: Option<String>,
    pub round: u32,
    /// Conditions the DM pushed onto this character.
    pub dm_conditions: Vec<String>,
    /// Initiative the DM set on this character's behalf.
    pub dm_initiative: Option<i32>,
}

impl PlayerCombatClient {
    pub fn new(
        mesa_id: impl Into<MesaId>,
        character_id: impl Into<CharacterId>,
    ) -> Self {
        Self {
            mesa_id: mesa_id.into(),
            character_id: character_id.into(),
            combat_active: false,
            initiative_requested: false,
            is_my_turn: false,
            current_turn_name: None,
            round: 0,
            dm_conditions: Vec::new(),
            dm_initiative: None,
        }
    }

    pub fn mesa_id(&self) -> &MesaId {
        &self.mesa_id
    }

    pub fn character_id(&self) -> &CharacterId {
        &self.character_id
    }

    // -- Inbound ------------------------------------------------------------

    /// Folds one broadcast into the derived view. Events for other mesas
    /// or other characters fall through without effect.
    pub fn apply(&mut self, event: &TableEvent) {
        if event.mesa_id() != &self.mesa_id {
            return;
        }
        match event {
            TableEvent::CombatStart { .. } => {
                self.reset();
                self.combat_active = true;
            }
            TableEvent::CombatEnd { .. } => {
                self.reset();
            }
            TableEvent::InitiativeRequest { .. } => {
                self.combat_active = true;
                self.initiative_requested = true;
            }
            TableEvent::TurnChange {
                current_entry,
                round,
                ..
            } => {
                // A turn:change implies combat is running even if the
                // combat:start broadcast was missed.
                self.combat_active = true;
                self.is_my_turn = current_entry.source_id == self.character_id;
                self.current_turn_name = Some(current_entry.name.clone());
                self.round = *round;
            }
            TableEvent::ConditionsUpdate {
                character_id,
                conditions,
                ..
            } if character_id == &self.character_id => {
                self.dm_conditions = conditions.clone();
            }
            TableEvent::InitiativeUpdate {
                character_id,
                initiative,
                ..
            } if character_id == &self.character_id => {
                self.dm_initiative = Some(*initiative);
            }
            _ => {}
        }
    }

    // -- Outbound -----------------------------------------------------------

    /// Answers the DM's initiative request.
    pub fn roll_initiative(
        &mut self,
        character_name: impl Into<String>,
        initiative: i32,
    ) -> TableEvent {
        self.initiative_requested = false;
        TableEvent::InitiativeRoll {
            mesa_id: self.mesa_id.clone(),
            character_id: self.character_id.clone(),
            character_name: character_name.into(),
            initiative,
        }
    }

    pub fn end_turn(&self) -> TableEvent {
        TableEvent::TurnEnd {
            mesa_id: self.mesa_id.clone(),
            character_id: self.character_id.clone(),
        }
    }

    pub fn report_health(&self, health: i32) -> TableEvent {
        TableEvent::HealthUpdate {
            mesa_id: self.mesa_id.clone(),
            character_id: self.character_id.clone(),
            health,
        }
    }

    pub fn report_actions(&self, actions: TurnActions) -> TableEvent {
        TableEvent::ActionUpdate {
            mesa_id: self.mesa_id.clone(),
            character_id: self.character_id.clone(),
            available_actions: actions,
        }
    }

    /// Issued on mount and on reconnect; the DM replays the current
    /// phase in response. Harmless to repeat.
    pub fn sync_request(&self) -> TableEvent {
        TableEvent::SyncRequest {
            mesa_id: self.mesa_id.clone(),
        }
    }

    fn reset(&mut self) {
        self.combat_active = false;
        self.initiative_requested = false;
        self.is_my_turn = false;
        self.current_turn_name = None;
        self.round = 0;
        self.dm_conditions.clear();
        self.dm_initiative = None;
    }
}

// =========================================================================
// Tests
// =========================================================================
