//! Room membership and rebroadcast rules for the Mesaforge relay.
//!
//! The relay is deliberately dumb: it holds a live membership table and
//! forwards named events to the other members of a room, nothing more.
//! Combat state lives in the DM's client and is reconstructed through
//! `combat:sync:request`, never by the server.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — mesa id → member connections, the only server state
//! - [`MemberSender`] — per-member outbound frame channel
//!
//! Relay operations are total: an empty target room, an unknown member,
//! or a repeated join all degrade to no-ops, so this crate exposes no
//! error type.

mod registry;

pub use registry::{MemberSender, RoomRegistry};
