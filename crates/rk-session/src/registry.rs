//! Process-wide lookup maps (§4.4).
//!
//! Grounded on `room.go`'s `roomRegistry` and `match.go`'s `clients`/
//! `clientsMu`/`pendingPlayers` globals, translated from four
//! `map + sync.RWMutex` pairs into four `DashMap`s — one lock per bucket
//! rather than one lock per concern, but the same "never nest locks"
//! discipline (§9 "Global mutable state").

use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use rk_types::ids::{RoomId, Username};
use rk_types::protocol::ServerEnvelope;

use crate::connection::Connection;
use crate::room::Room;

/// The four maps named in §4.4, plus the reverse `room_of_user` lookup used
/// to find a disconnecting player's room without scanning every `Room`.
#[derive(Default)]
pub struct Registry {
    pub clients: DashMap<Username, Arc<Connection>>,
    pub pending: DashSet<Username>,
    pub rooms: DashMap<RoomId, Arc<Room>>,
    pub room_of_user: DashMap<Username, RoomId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the live connection for a username. Called
    /// whenever a frame arrives that names its sender, so a reconnect's new
    /// socket silently supersedes a stale one.
    pub fn bind_connection(&self, username: Username, connection: Arc<Connection>) {
        self.clients.insert(username, connection);
    }

    /// Look up a connection under the map's internal lock, then hand the
    /// write off to a fresh task so a slow peer can never stall the caller
    /// (§4.4 contract). Missing or dead connections are logged and dropped.
    pub fn send_to_client(self: &Arc<Self>, username: Username, envelope: ServerEnvelope) {
        let Some(connection) = self.clients.get(&username).map(|entry| entry.value().clone()) else {
            tracing::debug!(%username, "send_to_client: no connection registered");
            return;
        };
        if connection.is_closed() {
            tracing::debug!(%username, "send_to_client: connection already closed");
            return;
        }
        tokio::spawn(async move {
            connection.safe_write(&envelope).await;
        });
    }

    pub fn room_for(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|entry| entry.value().clone())
    }

    /// Remove every trace of a finished or abandoned match (§4.6
    /// `cleanupUser`, applied to both seats at once).
    pub fn forget_room(&self, room_id: &RoomId, player1: &Username, player2: &Username) {
        self.rooms.remove(room_id);
        self.room_of_user.remove(player1);
        self.room_of_user.remove(player2);
    }
}
