//! Identity types and small payload structs shared across the wire.
//!
//! Everything in this module travels inside a [`TableEvent`](crate::TableEvent)
//! payload. Ids are newtype wrappers over `String` because they originate
//! in the session manager's database, not on this server; the relay never
//! generates them, it only routes by them.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a table session (a "mesa"): one RPG group's shared
/// real-time room. The relay keys room membership by this id.
///
/// `#[serde(transparent)]` keeps the JSON as a plain string, matching
/// what the browser clients send: `"mesaId": "m-1abc"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MesaId(pub String);

impl fmt::Display for MesaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesa-{}", self.0)
    }
}

impl From<&str> for MesaId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MesaId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a player character. Inbound player events carry this to
/// correlate with the matching initiative entry (`source_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub String);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "char-{}", self.0)
    }
}

impl From<&str> for CharacterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CharacterId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of an encounter: a combat scenario with a fixed cast.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncounterId(pub String);

impl fmt::Display for EncounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enc-{}", self.0)
    }
}

impl From<&str> for EncounterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EncounterId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of one initiative entry, unique within a combat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry-{}", self.0)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// What kind of combatant an initiative entry represents.
///
/// Only `Player` entries are externally mutable through relay events;
/// enemies and NPCs are edited by the DM alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Player,
    Enemy,
    Npc,
}

/// The per-turn action counters that cross the wire.
///
/// This is deliberately narrower than the DM-local budget: `full` and
/// `reaction` counts never leave the DM's client. The default is the
/// fresh-turn budget of one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnActions {
    pub standard: u8,
    pub movement: u8,
    pub free: u8,
}

impl Default for TurnActions {
    fn default() -> Self {
        Self {
            standard: 1,
            movement: 1,
            free: 1,
        }
    }
}

/// The `currentEntry` payload of a `turn:change` broadcast: just enough
/// for a player client to answer "whose turn is it, and is it mine?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnEntry {
    pub id: EntryId,
    pub name: String,
    pub kind: EntryKind,
    /// Character id for player entries; creature id otherwise. Player
    /// clients compare this against their own character id.
    pub source_id: CharacterId,
}

// =========================================================================
// Tests
// =========================================================================
