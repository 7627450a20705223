//! # Mesaforge
//!
//! Combat synchronization for browser-based tabletop RPG sessions.
//!
//! Mesaforge is three things in one workspace: a stateless WebSocket
//! relay that routes table events between the members of a mesa (table
//! session), a DM-side combat state machine that owns the authoritative
//! initiative and turn order, and a player-side client that derives its
//! view entirely from broadcasts. The relay never holds combat state;
//! clients that fall behind recover with `combat:sync:request`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mesaforge::prelude::*;
//!
//! # async fn run() -> Result<(), MesaforgeError> {
//! let server = RelayServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::MesaforgeError;
pub use server::{RelayServer, RelayServerBuilder};

/// The working set most users need: server types, the event taxonomy,
/// and the two combat-side clients.
pub mod prelude {
    pub use crate::{MesaforgeError, RelayServer, RelayServerBuilder};

    pub use mesaforge_combat::{
        ActionBudget, CharacterPatch, CharacterStore, CombatError,
        CombatState, CombatStatus, DmBridge, EntryUpdate, FieldGroup,
        InitiativeEntry, PlayerCombatClient, StoreError, WriteJournal,
    };
    pub use mesaforge_protocol::{
        CharacterId, Codec, EncounterId, EntryId, EntryKind, Envelope,
        JsonCodec, MesaId, TableEvent, TurnActions, TurnEntry,
    };
    pub use mesaforge_relay::RoomRegistry;
    pub use mesaforge_transport::{
        Connection, ConnectionId, Transport, WebSocketTransport,
    };
}
