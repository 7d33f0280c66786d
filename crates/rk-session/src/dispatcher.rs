//! Per-connection read loop (§4.3, §4.11).
//!
//! Grounded on `websocket.go`'s accept loop + `router.go`'s `HandleMessage`
//! type switch: one task per socket reads frames, decodes the envelope, and
//! routes by `type`. Unlike the original's direct-call dispatch, each
//! command here runs inside its own `tokio::spawn` so a handler panic can't
//! take the connection's read loop down with it (§5 "Panic isolation") —
//! `JoinError::is_panic()` tells the difference between "handler panicked"
//! and "handler finished".

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::StreamExt;

use rk_store::UserStore;
use rk_types::ids::{RoomId, Username};
use rk_types::protocol::{kind, ClientMessage, LoginData, ServerEnvelope};

use crate::auth::AuthService;
use crate::config::SessionConfig;
use crate::connection::Connection;
use crate::matchmaker::Matchmaker;
use crate::registry::Registry;
use crate::room::Room;

/// Everything a connection's dispatch loop needs, bundled so `tools/rk-server`
/// only has to build one of these per process and clone it per socket.
pub struct ServerState {
    pub registry: Arc<Registry>,
    pub auth: Arc<AuthService>,
    pub matchmaker: Arc<Matchmaker>,
    pub user_store: Arc<dyn UserStore>,
    pub config: SessionConfig,
}

/// The `type` tags `ClientMessage` understands (§6 command taxonomy). A
/// frame whose `type` isn't in this set is a *decode failure of a different
/// kind* than a malformed payload for a known type: §4.11 closes the socket
/// on the former and keeps it open on the latter.
const KNOWN_TYPES: &[&str] = &[
    "register", "login", "get_user", "find_match", "get_game", "attack", "heal", "skip_turn", "select_troop", "play_again",
];

/// Drive one accepted `/ws` socket until it closes. Forfeits any in-progress
/// match on the way out (§9 open question: disconnect mid-match forfeits).
pub async fn run_connection(socket: WebSocket, state: Arc<ServerState>) {
    let (sink, mut stream) = socket.split();
    let connection = Arc::new(Connection::new(sink, state.config.write_deadline));
    let mut bound_username: Option<Username> = None;

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%err, "websocket read error, closing connection");
                break;
            }
        };

        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let value: serde_json::Value = match serde_json::from_str(text.as_str()) {
            Ok(value) => value,
            Err(err) => {
                connection.safe_write(&ServerEnvelope::error(kind::ERROR, format!("malformed request: {err}"))).await;
                continue;
            }
        };

        match value.get("type").and_then(|t| t.as_str()) {
            Some(t) if KNOWN_TYPES.contains(&t) => {}
            Some(t) => {
                connection.safe_write(&ServerEnvelope::error(kind::ERROR, format!("unknown command type {t:?}"))).await;
                break;
            }
            None => {
                connection.safe_write(&ServerEnvelope::error(kind::ERROR, "missing \"type\" field")).await;
                continue;
            }
        }

        let message: ClientMessage = match serde_json::from_value(value) {
            Ok(message) => message,
            Err(err) => {
                connection.safe_write(&ServerEnvelope::error(kind::ERROR, format!("malformed request: {err}"))).await;
                continue;
            }
        };

        if let Some(username) = message.username() {
            state.registry.bind_connection(username.clone(), connection.clone());
            bound_username = Some(username.clone());
        }

        let state = state.clone();
        let connection = connection.clone();
        let handler = tokio::spawn(async move { dispatch_one(&state, &connection, message).await });
        if let Err(join_err) = handler.await {
            if join_err.is_panic() {
                tracing::error!("command handler panicked");
                connection.safe_write(&ServerEnvelope::error(kind::ERROR, "internal error")).await;
            }
        }
    }

    if let Some(username) = bound_username {
        let room = state.registry.room_of_user.get(&username).map(|entry| entry.value().clone()).and_then(|room_id| state.registry.room_for(&room_id));
        if let Some(room) = room {
            room.forfeit(&username).await;
        }
        state.registry.pending.remove(&username);
    }
}

async fn resolve_room(state: &ServerState, connection: &Arc<Connection>, room_id: &RoomId) -> Option<Arc<Room>> {
    match state.registry.room_for(room_id) {
        Some(room) => Some(room),
        None => {
            connection.safe_write(&ServerEnvelope::error(kind::ERROR, format!("room {room_id} not found"))).await;
            None
        }
    }
}

async fn dispatch_one(state: &ServerState, connection: &Arc<Connection>, message: ClientMessage) {
    match message {
        ClientMessage::Register { username, password } => match state.auth.register(&username, &password).await {
            Ok(view) => connection.safe_write(&ServerEnvelope::ok(kind::REGISTER_RESPONSE, "Registration successful", &view)).await,
            Err(err) => connection.safe_write(&ServerEnvelope::error(kind::REGISTER_RESPONSE, err.client_message())).await,
        },

        ClientMessage::Login { username, password } => match state.auth.login(&username, &password).await {
            Ok((session_id, user)) => {
                state.registry.bind_connection(Username::from(username), connection.clone());
                connection
                    .safe_write(&ServerEnvelope::ok(kind::LOGIN_RESPONSE, "Login successful", &LoginData { session_id, user }))
                    .await;
            }
            Err(err) => connection.safe_write(&ServerEnvelope::error(kind::LOGIN_RESPONSE, err.client_message())).await,
        },

        ClientMessage::GetUser { session_id } => match state.auth.get_user(&session_id).await {
            Ok(view) => connection.safe_write(&ServerEnvelope::ok(kind::USER_RESPONSE, "ok", &view)).await,
            Err(err) => connection.safe_write(&ServerEnvelope::error(kind::USER_RESPONSE, err.client_message())).await,
        },

        ClientMessage::FindMatch { username, mode } => {
            let level = match state.user_store.find_by_username(username.as_str()).await {
                Ok(Some(user)) => user.level,
                Ok(None) => {
                    connection.safe_write(&ServerEnvelope::error(kind::MATCH_FOUND, "unknown user")).await;
                    return;
                }
                Err(err) => {
                    connection.safe_write(&ServerEnvelope::error(kind::MATCH_FOUND, err.to_string())).await;
                    return;
                }
            };
            if let Err(err) = state.matchmaker.find_match(username, level, mode).await {
                connection.safe_write(&ServerEnvelope::error(kind::MATCH_FOUND, err.client_message())).await;
            }
        }

        ClientMessage::GetGame { room_id, username } => {
            if let Some(room) = resolve_room(state, connection, &room_id).await {
                match room.get_game(&username).await {
                    Ok(view) => connection.safe_write(&ServerEnvelope::ok(kind::GAME_RESPONSE, "ok", &view)).await,
                    Err(err) => connection.safe_write(&ServerEnvelope::error(kind::GAME_RESPONSE, err.client_message())).await,
                }
            }
        }

        ClientMessage::Attack { room_id, username, troop, target } => {
            if let Some(room) = resolve_room(state, connection, &room_id).await {
                if let Err(err) = room.attack(&username, &troop, &target).await {
                    connection.safe_write(&ServerEnvelope::error(kind::ATTACK_RESPONSE, err.client_message())).await;
                }
            }
        }

        ClientMessage::Heal { room_id, username, troop } => {
            if let Some(room) = resolve_room(state, connection, &room_id).await {
                if let Err(err) = room.heal(&username, &troop).await {
                    connection.safe_write(&ServerEnvelope::error(kind::HEAL_RESPONSE, err.client_message())).await;
                }
            }
        }

        ClientMessage::SkipTurn { room_id, username } => {
            if let Some(room) = resolve_room(state, connection, &room_id).await {
                if let Err(err) = room.skip_turn(&username).await {
                    connection.safe_write(&ServerEnvelope::error(kind::SKIP_TURN_RESPONSE, err.client_message())).await;
                }
            }
        }

        ClientMessage::SelectTroop { room_id, username, troop, x, y } => {
            if let Some(room) = resolve_room(state, connection, &room_id).await {
                if let Err(err) = room.select_troop(&username, &troop, x, y).await {
                    connection.safe_write(&ServerEnvelope::error(kind::SELECT_TROOP_RESPONSE, err.client_message())).await;
                }
            }
        }

        ClientMessage::PlayAgain { room_id } => match state.registry.room_for(&room_id) {
            Some(room) => {
                state.registry.forget_room(&room_id, &room.player1, &room.player2);
                let envelope = ServerEnvelope::ok_empty(kind::PLAY_AGAIN_RESPONSE, "Room closed. Find a new match to play again.");
                state.registry.send_to_client(room.player1.clone(), envelope.clone());
                state.registry.send_to_client(room.player2.clone(), envelope);
            }
            None => connection.safe_write(&ServerEnvelope::error(kind::PLAY_AGAIN_RESPONSE, format!("room {room_id} not found"))).await,
        },
    }
}
