use mesaforge_protocol::EntryId;

use crate::CombatStatus;

/// Errors from DM-side combat operations.
///
/// These surface in the DM's own UI only. Events arriving over the relay
/// never produce them; mistimed or malformed input from the network is
/// dropped with a debug log instead (see `DmBridge::handle_event`).
#[derive(Debug, thiserror::Error)]
pub enum CombatError {
    #[error("no entry with id {0} in the initiative order")]
    UnknownEntry(EntryId),

    #[error("cannot {action} while combat is {status}")]
    InvalidTransition {
        status: CombatStatus,
        action: &'static str,
    },

    #[error("{missing} entries have not rolled initiative yet")]
    InitiativePending { missing: usize },

    #[error("cannot begin a round with an empty initiative order")]
    EmptyOrder,
}

/// Errors from the character persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("write rejected: {0}")]
    Rejected(String),
}
