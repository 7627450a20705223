//! The table event taxonomy: every message a mesa's members exchange.
//!
//! The relay treats these as opaque payloads with one exception: it reads
//! [`TableEvent::mesa_id`] to pick the target room, and it handles the
//! two room-control events (`mesa:join` / `mesa:leave`) itself instead of
//! forwarding them. Everything else is rebroadcast verbatim to the other
//! members of the room.
//!
//! The JSON shape is internally tagged with an `"event"` field carrying
//! the colon-separated event name, and camelCase payload keys:
//!
//! ```json
//! { "event": "turn:change", "mesaId": "t1", "currentEntry": {...}, "round": 2 }
//! ```

use serde::{Deserialize, Serialize};

use crate::{CharacterId, EncounterId, MesaId, TurnActions, TurnEntry};

/// A named combat event scoped to one table session.
///
/// Grouped by direction. The relay does not enforce direction; the DM
/// bridge and player clients simply ignore events they have no handler
/// for, so a mis-addressed event degrades to a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum TableEvent {
    // -- Room control (handled by the relay itself) --
    /// Adds the sending connection to the mesa's room.
    #[serde(rename = "mesa:join")]
    MesaJoin { mesa_id: MesaId },

    /// Removes the sending connection from the mesa's room.
    #[serde(rename = "mesa:leave")]
    MesaLeave { mesa_id: MesaId },

    // -- DM → players --
    /// Combat has begun for the given encounter.
    #[serde(rename = "combat:start")]
    CombatStart {
        mesa_id: MesaId,
        encounter_id: EncounterId,
    },

    /// Combat is over; player clients reset to neutral.
    #[serde(rename = "combat:end")]
    CombatEnd {
        mesa_id: MesaId,
        encounter_id: EncounterId,
    },

    /// The DM is collecting initiative rolls.
    #[serde(rename = "initiative:request")]
    InitiativeRequest {
        mesa_id: MesaId,
        encounter_id: EncounterId,
    },

    /// The turn pointer moved (or a sync request replayed it).
    #[serde(rename = "turn:change")]
    TurnChange {
        mesa_id: MesaId,
        current_entry: TurnEntry,
        round: u32,
    },

    /// The DM changed a character's status conditions.
    #[serde(rename = "character:conditions:update")]
    ConditionsUpdate {
        mesa_id: MesaId,
        character_id: CharacterId,
        conditions: Vec<String>,
    },

    /// The DM set a character's initiative on their behalf.
    #[serde(rename = "character:initiative:update")]
    InitiativeUpdate {
        mesa_id: MesaId,
        character_id: CharacterId,
        initiative: i32,
    },

    // -- Player → DM --
    /// A player submits their initiative roll.
    #[serde(rename = "initiative:roll")]
    InitiativeRoll {
        mesa_id: MesaId,
        character_id: CharacterId,
        character_name: String,
        initiative: i32,
    },

    /// A player ends their turn.
    #[serde(rename = "turn:end")]
    TurnEnd {
        mesa_id: MesaId,
        character_id: CharacterId,
    },

    /// A player spent actions this turn.
    #[serde(rename = "character:action:update")]
    ActionUpdate {
        mesa_id: MesaId,
        character_id: CharacterId,
        available_actions: TurnActions,
    },

    /// A player's hit points changed on their own sheet.
    #[serde(rename = "character:health:update")]
    HealthUpdate {
        mesa_id: MesaId,
        character_id: CharacterId,
        health: i32,
    },

    // -- Bidirectional --
    /// Pull-based recovery: a late joiner or reconnecting client asks the
    /// DM to replay the current combat phase. Safe to repeat.
    #[serde(rename = "combat:sync:request")]
    SyncRequest { mesa_id: MesaId },
}

impl TableEvent {
    /// The routing key: which table session this event belongs to.
    pub fn mesa_id(&self) -> &MesaId {
        match self {
            Self::MesaJoin { mesa_id }
            | Self::MesaLeave { mesa_id }
            | Self::CombatStart { mesa_id, .. }
            | Self::CombatEnd { mesa_id, .. }
            | Self::InitiativeRequest { mesa_id, .. }
            | Self::TurnChange { mesa_id, .. }
            | Self::ConditionsUpdate { mesa_id, .. }
            | Self::InitiativeUpdate { mesa_id, .. }
            | Self::InitiativeRoll { mesa_id, .. }
            | Self::TurnEnd { mesa_id, .. }
            | Self::ActionUpdate { mesa_id, .. }
            | Self::HealthUpdate { mesa_id, .. }
            | Self::SyncRequest { mesa_id } => mesa_id,
        }
    }

    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MesaJoin { .. } => "mesa:join",
            Self::MesaLeave { .. } => "mesa:leave",
            Self::CombatStart { .. } => "combat:start",
            Self::CombatEnd { .. } => "combat:end",
            Self::InitiativeRequest { .. } => "initiative:request",
            Self::TurnChange { .. } => "turn:change",
            Self::ConditionsUpdate { .. } => "character:conditions:update",
            Self::InitiativeUpdate { .. } => "character:initiative:update",
            Self::InitiativeRoll { .. } => "initiative:roll",
            Self::TurnEnd { .. } => "turn:end",
            Self::ActionUpdate { .. } => "character:action:update",
            Self::HealthUpdate { .. } => "character:health:update",
            Self::SyncRequest { .. } => "combat:sync:request",
        }
    }

    /// `true` for the events the relay consumes itself instead of
    /// forwarding (`mesa:join` / `mesa:leave`).
    pub fn is_room_control(&self) -> bool {
        matches!(self, Self::MesaJoin { .. } | Self::MesaLeave { .. })
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level wire frame. Every WebSocket message is one `Envelope`.
///
/// `seq` is a per-connection counter; `timestamp` is sender-local
/// milliseconds. Both exist for debugging and ordering diagnostics only;
/// the relay forwards frames in arrival order and makes no cross-sender
/// ordering promise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub seq: u64,
    pub timestamp: u64,
    pub event: TableEvent,
}

impl Envelope {
    /// Wraps an event with the given sequence number and a zero timestamp.
    /// Callers that care about the timestamp set it themselves.
    pub fn new(seq: u64, event: TableEvent) -> Self {
        Self {
            seq,
            timestamp: 0,
            event,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
