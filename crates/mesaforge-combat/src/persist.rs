//! Optimistic persistence of player-reported character changes.
//!
//! The DM's client applies incoming updates to combat state and relays
//! them immediately; writing them to the character store happens on a
//! debounce behind a [`WriteJournal`]. A write that later fails yields
//! the pre-mutation snapshot back to the caller, which rolls the local
//! value back and tells the DM. Broadcasts are never blocked or
//! reverted by storage.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use mesaforge_protocol::{CharacterId, TurnActions};

use crate::StoreError;

/// How long a pending write waits for further edits to the same field
/// group before it is flushed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// The field groups a character sheet is patched by. One pending write
/// exists per character per group; edits within a group coalesce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    Health,
    Mana,
    Actions,
    Conditions,
    Initiative,
}

/// A partial character-sheet write, one field group at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum CharacterPatch {
    Health { current: i32 },
    Mana { current: i32 },
    Actions(TurnActions),
    Conditions(Vec<String>),
    Initiative(i32),
}

impl CharacterPatch {
    pub fn group(&self) -> FieldGroup {
        match self {
            Self::Health { .. } => FieldGroup::Health,
            Self::Mana { .. } => FieldGroup::Mana,
            Self::Actions(_) => FieldGroup::Actions,
            Self::Conditions(_) => FieldGroup::Conditions,
            Self::Initiative(_) => FieldGroup::Initiative,
        }
    }
}

/// The character storage backend the DM client writes through.
///
/// The core only needs this one call; everything else about the sheet
/// (CRUD, ownership, validation) lives outside this crate.
pub trait CharacterStore {
    async fn persist(
        &self,
        character_id: &CharacterId,
        patch: &CharacterPatch,
    ) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct PendingWrite {
    /// Value before the first uncommitted mutation. Kept across
    /// coalesced edits so a revert lands on truly persisted state.
    snapshot: CharacterPatch,
    patch: CharacterPatch,
    due_at: Instant,
}

/// A write that has waited out its debounce window and should be
/// persisted now.
#[derive(Debug, Clone, PartialEq)]
pub struct DueWrite {
    pub character_id: CharacterId,
    pub patch: CharacterPatch,
}

/// A failed write's pre-mutation snapshot, for the caller to restore.
#[derive(Debug, Clone, PartialEq)]
pub struct Rollback {
    pub character_id: CharacterId,
    pub snapshot: CharacterPatch,
}

/// Outcome of one [`WriteJournal::flush_due`] pass.
#[derive(Debug, Default, PartialEq)]
pub struct FlushReport {
    pub persisted: usize,
    pub rollbacks: Vec<Rollback>,
}

/// Debounced journal of optimistic character writes.
///
/// Keyed by `(character, field group)`. Re-recording the same key
/// before the window elapses keeps the earliest snapshot, takes the
/// latest patch, and restarts the window. Writes handed out by
/// [`drain_due`](Self::drain_due) stay tracked until the caller
/// confirms or reverts them.
pub struct WriteJournal {
    window: Duration,
    pending: HashMap<(CharacterId, FieldGroup), PendingWrite>,
    in_flight: HashMap<(CharacterId, FieldGroup), CharacterPatch>,
}

impl Default for WriteJournal {
    fn default() -> Self {
        Self::with_window(DEFAULT_DEBOUNCE)
    }
}

impl WriteJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
            in_flight: HashMap::new(),
        }
    }

    /// Records a mutation to be persisted once the window elapses.
    ///
    /// `snapshot` is the value before this mutation; it is only kept if
    /// no earlier uncommitted snapshot exists for the same key.
    pub fn record(
        &mut self,
        character_id: CharacterId,
        snapshot: CharacterPatch,
        patch: CharacterPatch,
    ) {
        debug_assert_eq!(snapshot.group(), patch.group());
        let key = (character_id, patch.group());
        let due_at = Instant::now() + self.window;
        match self.pending.get_mut(&key) {
            Some(pending) => {
                pending.patch = patch;
                pending.due_at = due_at;
            }
            None => {
                self.pending.insert(
                    key,
                    PendingWrite {
                        snapshot,
                        patch,
                        due_at,
                    },
                );
            }
        }
    }

    /// Number of writes waiting out their window.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Takes every write whose window has elapsed. The snapshots move
    /// to an in-flight set until [`confirm`](Self::confirm) or
    /// [`revert`](Self::revert).
    pub fn drain_due(&mut self) -> Vec<DueWrite> {
        let now = Instant::now();
        let due_keys: Vec<_> = self
            .pending
            .iter()
            .filter(|(_, w)| w.due_at <= now)
            .map(|(k, _)| k.clone())
            .collect();

        let mut due = Vec::with_capacity(due_keys.len());
        for key in due_keys {
            // Key was just collected from the map.
            let write = self.pending.remove(&key).unwrap();
            self.in_flight.insert(key.clone(), write.snapshot);
            due.push(DueWrite {
                character_id: key.0,
                patch: write.patch,
            });
        }
        due
    }

    /// The store accepted the write; forget the snapshot.
    pub fn confirm(&mut self, character_id: &CharacterId, group: FieldGroup) {
        self.in_flight.remove(&(character_id.clone(), group));
    }

    /// The store rejected the write; hand back the snapshot to restore.
    pub fn revert(
        &mut self,
        character_id: &CharacterId,
        group: FieldGroup,
    ) -> Option<CharacterPatch> {
        self.in_flight.remove(&(character_id.clone(), group))
    }

    /// Persists every due write through the store. Failures are logged
    /// and returned as rollbacks; they never abort the pass.
    pub async fn flush_due<S: CharacterStore>(
        &mut self,
        store: &S,
    ) -> FlushReport {
        let mut report = FlushReport::default();
        for write in self.drain_due() {
            let group = write.patch.group();
            match store.persist(&write.character_id, &write.patch).await {
                Ok(()) => {
                    self.confirm(&write.character_id, group);
                    report.persisted += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        character_id = %write.character_id,
                        ?group,
                        %err,
                        "character write failed, rolling back"
                    );
                    if let Some(snapshot) =
                        self.revert(&write.character_id, group)
                    {
                        report.rollbacks.push(Rollback {
                            character_id: write.character_id,
                            snapshot,
                        });
                    }
                }
            }
        }
        report
    }
}

// =========================================================================
// Tests
// =========================================================================
