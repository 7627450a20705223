//! Room registry: the relay's only state.
//!
//! Membership is an explicit mapping from mesa id to member connections,
//! with join/leave/disconnect as the only mutators. Keeping it a plain
//! data structure (no transport handle inside) makes the rebroadcast
//! rules testable without a live socket.

use std::collections::{HashMap, HashSet};

use mesaforge_protocol::{Envelope, MesaId};
use mesaforge_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel sender delivering outbound frames to one member's writer task.
pub type MemberSender = mpsc::UnboundedSender<Envelope>;

/// Tracks which connections are in which mesa rooms.
///
/// Not thread-safe by itself: the server owns one instance behind a
/// mutex, and every mutation (join, leave, disconnect) is a single
/// operation under that lock. The registry holds no history and no
/// payload knowledge; if every connection drops, it is empty again.
#[derive(Default)]
pub struct RoomRegistry {
    /// Members of each room, with the channel to reach each one.
    rooms: HashMap<MesaId, HashMap<ConnectionId, MemberSender>>,

    /// Reverse index: every room a connection has joined. Used to make
    /// disconnect an implicit leave from all of them.
    joined: HashMap<ConnectionId, HashSet<MesaId>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a room. Idempotent: re-joining refreshes the
    /// member's outbound channel (the reconnect path sends a fresh one).
    pub fn join(
        &mut self,
        mesa_id: &MesaId,
        conn_id: ConnectionId,
        sender: MemberSender,
    ) {
        self.rooms
            .entry(mesa_id.clone())
            .or_default()
            .insert(conn_id, sender);
        self.joined
            .entry(conn_id)
            .or_default()
            .insert(mesa_id.clone());

        tracing::info!(
            %mesa_id,
            %conn_id,
            members = self.member_count(mesa_id),
            "connection joined room"
        );
    }

    /// Removes a connection from a room. Idempotent: leaving a room the
    /// connection is not in is a no-op.
    pub fn leave(&mut self, mesa_id: &MesaId, conn_id: ConnectionId) {
        let mut removed = false;
        if let Some(members) = self.rooms.get_mut(mesa_id) {
            removed = members.remove(&conn_id).is_some();
            if members.is_empty() {
                self.rooms.remove(mesa_id);
            }
        }
        if let Some(joined) = self.joined.get_mut(&conn_id) {
            joined.remove(mesa_id);
            if joined.is_empty() {
                self.joined.remove(&conn_id);
            }
        }

        if removed {
            tracing::info!(%mesa_id, %conn_id, "connection left room");
        }
    }

    /// Removes a connection from every room it had joined.
    ///
    /// Called when the socket closes. No event is broadcast to the
    /// remaining members; an explicit `mesa:leave` is the only signal
    /// peers ever get.
    pub fn disconnect(&mut self, conn_id: ConnectionId) {
        let Some(joined) = self.joined.remove(&conn_id) else {
            return;
        };
        for mesa_id in &joined {
            if let Some(members) = self.rooms.get_mut(mesa_id) {
                members.remove(&conn_id);
                if members.is_empty() {
                    self.rooms.remove(mesa_id);
                }
            }
        }
        tracing::info!(%conn_id, rooms = joined.len(), "connection disconnected");
    }

    /// Delivers a frame to every member of the target room except the
    /// sender. The target room is read from the event's own mesa id; the
    /// rest of the payload is never inspected.
    ///
    /// Returns the number of members the frame was handed to. An empty
    /// (or nonexistent) room is a silent no-op, not an error. Members
    /// whose writer task is gone are skipped the same way.
    pub fn relay(
        &self,
        sender_conn: ConnectionId,
        envelope: &Envelope,
    ) -> usize {
        let mesa_id = envelope.event.mesa_id();
        let Some(members) = self.rooms.get(mesa_id) else {
            tracing::debug!(
                %mesa_id,
                event = envelope.event.name(),
                "relay to empty room, dropping"
            );
            return 0;
        };

        let mut delivered = 0;
        for (conn_id, sender) in members {
            if *conn_id == sender_conn {
                continue;
            }
            if sender.send(envelope.clone()).is_ok() {
                delivered += 1;
            }
        }

        tracing::debug!(
            %mesa_id,
            event = envelope.event.name(),
            from = %sender_conn,
            delivered,
            "relayed event"
        );
        delivered
    }

    /// Number of members currently in a room.
    pub fn member_count(&self, mesa_id: &MesaId) -> usize {
        self.rooms.get(mesa_id).map_or(0, HashMap::len)
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Whether a connection is currently a member of a room.
    pub fn is_member(&self, mesa_id: &MesaId, conn_id: ConnectionId) -> bool {
        self.rooms
            .get(mesa_id)
            .is_some_and(|m| m.contains_key(&conn_id))
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use mesaforge_protocol::TableEvent;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn mesa(id: &str) -> MesaId {
        MesaId::from(id)
    }

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn member() -> (MemberSender, UnboundedReceiver<Envelope>) {
        mpsc::unbounded_channel()
    }

    fn sync_frame(mesa_id: &str) -> Envelope {
        Envelope::new(
            1,
            TableEvent::SyncRequest {
                mesa_id: mesa(mesa_id),
            },
        )
    }

    #[test]
    fn test_join_adds_member() {
        let mut reg = RoomRegistry::new();
        let (tx, _rx) = member();

        reg.join(&mesa("t1"), conn(1), tx);

        assert_eq!(reg.member_count(&mesa("t1")), 1);
        assert!(reg.is_member(&mesa("t1"), conn(1)));
    }

    #[test]
    fn test_join_twice_is_idempotent() {
        let mut reg = RoomRegistry::new();
        let (tx1, _rx1) = member();
        let (tx2, _rx2) = member();

        reg.join(&mesa("t1"), conn(1), tx1);
        reg.join(&mesa("t1"), conn(1), tx2);

        assert_eq!(reg.member_count(&mesa("t1")), 1);
    }

    #[test]
    fn test_leave_removes_member() {
        let mut reg = RoomRegistry::new();
        let (tx, _rx) = member();
        reg.join(&mesa("t1"), conn(1), tx);

        reg.leave(&mesa("t1"), conn(1));

        assert!(!reg.is_member(&mesa("t1"), conn(1)));
        assert_eq!(reg.room_count(), 0, "empty room should be dropped");
    }

    #[test]
    fn test_leave_unknown_member_is_noop() {
        let mut reg = RoomRegistry::new();
        reg.leave(&mesa("t1"), conn(1));
        assert_eq!(reg.room_count(), 0);
    }

    #[test]
    fn test_relay_excludes_sender() {
        let mut reg = RoomRegistry::new();
        let (tx1, mut rx1) = member();
        let (tx2, mut rx2) = member();
        reg.join(&mesa("t1"), conn(1), tx1);
        reg.join(&mesa("t1"), conn(2), tx2);

        let delivered = reg.relay(conn(1), &sync_frame("t1"));

        assert_eq!(delivered, 1);
        assert!(rx1.try_recv().is_err(), "sender must not receive");
        assert!(rx2.try_recv().is_ok(), "other member must receive");
    }

    #[test]
    fn test_relay_routes_by_event_mesa_id() {
        let mut reg = RoomRegistry::new();
        let (tx1, mut rx1) = member();
        let (tx2, mut rx2) = member();
        reg.join(&mesa("t1"), conn(1), tx1);
        reg.join(&mesa("t2"), conn(2), tx2);

        // Sender is in t1, but the frame names t2: only t2 hears it.
        reg.relay(conn(1), &sync_frame("t2"));

        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_relay_to_empty_room_is_silent_noop() {
        let reg = RoomRegistry::new();
        let delivered = reg.relay(conn(1), &sync_frame("t1"));
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_relay_skips_dropped_receivers() {
        let mut reg = RoomRegistry::new();
        let (tx1, rx1) = member();
        let (tx2, mut rx2) = member();
        reg.join(&mesa("t1"), conn(1), tx1);
        reg.join(&mesa("t1"), conn(2), tx2);
        drop(rx1); // member 1's writer task is gone

        let delivered = reg.relay(conn(3), &sync_frame("t1"));

        assert_eq!(delivered, 1);
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_disconnect_removes_from_all_rooms() {
        let mut reg = RoomRegistry::new();
        let (tx1, _rx1) = member();
        let (tx2, _rx2) = member();
        reg.join(&mesa("t1"), conn(1), tx1);
        reg.join(&mesa("t2"), conn(1), tx2);

        reg.disconnect(conn(1));

        assert!(!reg.is_member(&mesa("t1"), conn(1)));
        assert!(!reg.is_member(&mesa("t2"), conn(1)));
        assert_eq!(reg.room_count(), 0);
    }

    #[test]
    fn test_disconnect_unknown_connection_is_noop() {
        let mut reg = RoomRegistry::new();
        reg.disconnect(conn(99));
        assert_eq!(reg.room_count(), 0);
    }

    #[test]
    fn test_disconnect_leaves_other_members_untouched() {
        let mut reg = RoomRegistry::new();
        let (tx1, _rx1) = member();
        let (tx2, mut rx2) = member();
        reg.join(&mesa("t1"), conn(1), tx1);
        reg.join(&mesa("t1"), conn(2), tx2);

        reg.disconnect(conn(1));

        // No broadcast on disconnect: the remaining member hears nothing.
        assert!(rx2.try_recv().is_err());
        assert!(reg.is_member(&mesa("t1"), conn(2)));
    }
}
