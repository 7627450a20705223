//! Unified error type for the Mesaforge toolkit.

use mesaforge_combat::{CombatError, StoreError};
use mesaforge_protocol::ProtocolError;
use mesaforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `mesaforge` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MesaforgeError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A DM-side combat transition error.
    #[error(transparent)]
    Combat(#[from] CombatError),

    /// A character persistence error.
    #[error(transparent)]
    Store(#[from] StoreError),
}
