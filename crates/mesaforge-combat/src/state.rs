//! Combat state data model.
//!
//! One `CombatState` exists per encounter and lives in the DM's client
//! only. Player clients never hold one of these; they derive their view
//! from broadcast events (see [`crate::PlayerCombatClient`]).

use serde::{Deserialize, Serialize};

use mesaforge_protocol::{
    CharacterId, EncounterId, EntryId, EntryKind, TurnActions, TurnEntry,
};

/// The combat lifecycle phase.
///
/// `Ended` is terminal. There is no rewind: restarting combat means
/// dropping the state and building a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatStatus {
    /// Combat declared, waiting for initiative rolls.
    RollingInitiative,
    /// Turn order locked, turns cycling.
    InProgress,
    /// Combat over. Terminal.
    Ended,
}

impl CombatStatus {
    /// Whether combat is still running in some form.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Ended)
    }
}

impl std::fmt::Display for CombatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RollingInitiative => "rolling_initiative",
            Self::InProgress => "in_progress",
            Self::Ended => "ended",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Action budget
// ---------------------------------------------------------------------------

/// The full per-turn action budget the DM tracks for each entry.
///
/// Wider than the wire shape: `full` and `reaction` are DM-local
/// bookkeeping, while `standard`/`movement`/`free` are what players
/// report back through `character:action:update`. [`ActionBudget::apply`]
/// therefore only overwrites those three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBudget {
    pub standard: u8,
    pub movement: u8,
    pub free: u8,
    pub full: u8,
    pub reaction: u8,
}

impl Default for ActionBudget {
    fn default() -> Self {
        Self {
            standard: 1,
            movement: 1,
            free: 1,
            full: 1,
            reaction: 1,
        }
    }
}

impl ActionBudget {
    /// Restores the full budget. Called when an entry's turn begins.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Overwrites the wire-visible counters, leaving `full` and
    /// `reaction` untouched.
    pub fn apply(&mut self, actions: TurnActions) {
        self.standard = actions.standard;
        self.movement = actions.movement;
        self.free = actions.free;
    }

    /// The wire-visible slice of the budget.
    pub fn as_turn_actions(&self) -> TurnActions {
        TurnActions {
            standard: self.standard,
            movement: self.movement,
            free: self.free,
        }
    }
}

// ---------------------------------------------------------------------------
// Initiative entries
// ---------------------------------------------------------------------------

/// One combatant in the initiative order.
///
/// `source_id` ties a player entry back to the character sheet it was
/// built from; enemy and NPC entries carry their bestiary id there.
/// Removal mid-combat is `is_defeated`, never a deletion, so turn
/// indices stay stable for the whole encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiativeEntry {
    pub id: EntryId,
    pub name: String,
    pub kind: EntryKind,
    pub source_id: CharacterId,
    /// `None` until the roll arrives (or the DM sets one).
    pub initiative: Option<i32>,
    pub current_pv: Option<i32>,
    pub max_pv: Option<i32>,
    pub current_pm: Option<i32>,
    pub max_pm: Option<i32>,
    pub ca: Option<i32>,
    /// Set by the DM only. Never derived from hit points.
    pub is_defeated: bool,
    pub conditions: Vec<String>,
    pub available_actions: ActionBudget,
}

impl InitiativeEntry {
    /// A fresh entry with no roll, no vitals, and a full action budget.
    pub fn new(
        id: impl Into<EntryId>,
        name: impl Into<String>,
        kind: EntryKind,
        source_id: impl Into<CharacterId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            source_id: source_id.into(),
            initiative: None,
            current_pv: None,
            max_pv: None,
            current_pm: None,
            max_pm: None,
            ca: None,
            is_defeated: false,
            conditions: Vec::new(),
            available_actions: ActionBudget::default(),
        }
    }

    /// The wire shape used as `currentEntry` in `turn:change`.
    pub fn turn_entry(&self) -> TurnEntry {
        TurnEntry {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            source_id: self.source_id.clone(),
        }
    }
}

/// Partial patch for an [`InitiativeEntry`]. `Some` fields overwrite,
/// `None` fields are left alone. No deep merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryUpdate {
    pub initiative: Option<i32>,
    pub current_pv: Option<i32>,
    pub max_pv: Option<i32>,
    pub current_pm: Option<i32>,
    pub max_pm: Option<i32>,
    pub ca: Option<i32>,
    pub is_defeated: Option<bool>,
    pub conditions: Option<Vec<String>>,
    pub available_actions: Option<TurnActions>,
}

// ---------------------------------------------------------------------------
// Combat state
// ---------------------------------------------------------------------------

/// The authoritative combat state for one encounter.
///
/// Owned by the DM's client alone; the relay never sees it and players
/// only see the events derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    pub encounter_id: EncounterId,
    pub status: CombatStatus,
    /// Starts at 1 and only ever increments.
    pub round: u32,
    pub current_turn_index: usize,
    pub initiative_order: Vec<InitiativeEntry>,
}

impl CombatState {
    /// The entry whose turn it is. `None` unless combat is in progress
    /// and the order is non-empty.
    pub fn current_entry(&self) -> Option<&InitiativeEntry> {
        if self.status != CombatStatus::InProgress {
            return None;
        }
        self.initiative_order.get(self.current_turn_index)
    }

    /// Looks up an entry by its id.
    pub fn entry(&self, id: &EntryId) -> Option<&InitiativeEntry> {
        self.initiative_order.iter().find(|e| &e.id == id)
    }

    /// Looks up the player entry backed by the given character sheet.
    /// Enemy and NPC entries are skipped even on a `source_id` match.
    pub fn player_entry_by_source(
        &self,
        character_id: &CharacterId,
    ) -> Option<&InitiativeEntry> {
        self.initiative_order
            .iter()
            .find(|e| e.kind == EntryKind::Player && &e.source_id == character_id)
    }

    pub(crate) fn player_entry_by_source_mut(
        &mut self,
        character_id: &CharacterId,
    ) -> Option<&mut InitiativeEntry> {
        self.initiative_order
            .iter_mut()
            .find(|e| e.kind == EntryKind::Player && &e.source_id == character_id)
    }
}

// =========================================================================
// Tests
// =========================================================================
