//! DM-authoritative combat for Mesaforge table sessions.
//!
//! The combat model is asymmetric on purpose. The DM's client owns the
//! only [`CombatState`]; player clients hold a derived
//! [`PlayerCombatClient`] view rebuilt entirely from broadcasts. The
//! relay in between stores nothing, so recovery is pull-based: a client
//! that lost the thread sends `combat:sync:request` and the
//! [`DmBridge`] replays the current phase.
//!
//! Character-sheet changes reported mid-combat are applied and relayed
//! immediately, then persisted optimistically through [`WriteJournal`]
//! and the [`CharacterStore`] seam.

#![allow(async_fn_in_trait)]

mod bridge;
mod error;
mod machine;
mod persist;
mod player;
mod state;

pub use bridge::DmBridge;
pub use error::{CombatError, StoreError};
pub use machine::TurnAdvance;
pub use persist::{
    CharacterPatch, CharacterStore, DueWrite, FieldGroup, FlushReport,
    Rollback, WriteJournal, DEFAULT_DEBOUNCE,
};
pub use player::PlayerCombatClient;
pub use state::{
    ActionBudget, CombatState, CombatStatus, EntryUpdate, InitiativeEntry,
};
