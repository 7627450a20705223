//! Wire protocol for Mesaforge.
//!
//! This crate defines the language that table members speak:
//!
//! - **Types** ([`MesaId`], [`CharacterId`], [`TurnEntry`], …) — the
//!   identities and payload structs that travel on the wire.
//! - **Events** ([`TableEvent`], [`Envelope`]) — the fixed taxonomy of
//!   combat and room-control events, one room topology, no extensions.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about connections, rooms, or combat
//! rules. The relay reads exactly one thing out of an event (its
//! [`mesa_id`](TableEvent::mesa_id)); the combat crates interpret the rest.

mod codec;
mod error;
mod event;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::{Envelope, TableEvent};
pub use types::{
    CharacterId, EncounterId, EntryId, EntryKind, MesaId, TurnActions,
    TurnEntry,
};
