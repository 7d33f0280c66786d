//! Wire protocol — the JSON frame envelope exchanged over the `/ws` socket.
//!
//! Client frames are adjacently tagged (`{"type": ..., "data": ...}`), mirroring
//! the teacher's `ClientMessage`/`ServerMessage` enums one step further: where
//! the teacher inlines fields directly under `type`, this protocol nests them
//! under an explicit `data` key, matching the envelope this system's clients
//! already speak. Server frames carry `success`/`message` alongside `type`,
//! which doesn't fit an adjacently tagged enum, so the server side is a plain
//! struct (`ServerEnvelope`) built from typed payloads.

use serde::{Deserialize, Serialize};

use crate::enums::GameMode;
use crate::ids::{RoomId, SessionToken, Username};

// =============================================================================
// Client -> server
// =============================================================================

/// Every command a client may send (§6 command taxonomy).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Register {
        username: String,
        password: String,
    },
    Login {
        username: String,
        password: String,
    },
    GetUser {
        session_id: SessionToken,
    },
    FindMatch {
        username: Username,
        mode: GameMode,
    },
    GetGame {
        room_id: RoomId,
        username: Username,
    },
    Attack {
        room_id: RoomId,
        username: Username,
        troop: String,
        target: String,
    },
    Heal {
        room_id: RoomId,
        username: Username,
        troop: String,
    },
    SkipTurn {
        room_id: RoomId,
        username: Username,
    },
    SelectTroop {
        room_id: RoomId,
        username: Username,
        troop: String,
        x: f64,
        y: f64,
    },
    PlayAgain {
        room_id: RoomId,
    },
}

impl ClientMessage {
    /// The sender-identifying username carried by this frame, if any.
    /// `Register`/`Login`/`PlayAgain` don't carry one — registration and
    /// login haven't resolved an identity yet, and `PlayAgain` only needs
    /// the room. Used by the dispatcher to (re)bind a connection in the
    /// registry as soon as a frame names its sender.
    pub fn username(&self) -> Option<&Username> {
        match self {
            ClientMessage::Register { .. } | ClientMessage::Login { .. } | ClientMessage::GetUser { .. } | ClientMessage::PlayAgain { .. } => None,
            ClientMessage::FindMatch { username, .. }
            | ClientMessage::GetGame { username, .. }
            | ClientMessage::Attack { username, .. }
            | ClientMessage::Heal { username, .. }
            | ClientMessage::SkipTurn { username, .. }
            | ClientMessage::SelectTroop { username, .. } => Some(username),
        }
    }
}

// =============================================================================
// Server -> client
// =============================================================================

/// `{"type", "success", "message", "data"?}`, matching the original server's
/// response envelope exactly (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ServerEnvelope {
    /// A success envelope with a typed payload. Panics only if `data` fails
    /// to serialize, which would mean a payload type is broken.
    pub fn ok<T: Serialize>(kind: impl Into<String>, message: impl Into<String>, data: &T) -> Self {
        Self {
            kind: kind.into(),
            success: true,
            message: message.into(),
            data: Some(serde_json::to_value(data).expect("response payload must serialize")),
        }
    }

    /// A success envelope with no payload (e.g. `match_timeout`).
    pub fn ok_empty(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            success: true,
            message: message.into(),
            data: None,
        }
    }

    /// A failure envelope (§7: every error kind replies this way, socket
    /// stays open except for IoError/InternalError at the connection layer).
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Response-kind tags, named once here so handlers never hand-type a
/// `"match_found"` string in three different places.
pub mod kind {
    pub const REGISTER_RESPONSE: &str = "register_response";
    pub const LOGIN_RESPONSE: &str = "login_response";
    pub const USER_RESPONSE: &str = "user_response";
    pub const MATCH_FOUND: &str = "match_found";
    pub const MATCH_TIMEOUT: &str = "match_timeout";
    pub const GAME_RESPONSE: &str = "game_response";
    pub const GAME_STATE: &str = "game_state";
    pub const ATTACK_RESPONSE: &str = "attack_response";
    pub const HEAL_RESPONSE: &str = "heal_response";
    pub const SELECT_TROOP_RESPONSE: &str = "select_troop_response";
    pub const SKIP_TURN_RESPONSE: &str = "skip_turn_response";
    pub const MANA_UPDATE: &str = "mana_update";
    pub const GAME_OVER_RESPONSE: &str = "game_over_response";
    pub const PLAY_AGAIN_RESPONSE: &str = "play_again_response";
    pub const ERROR: &str = "error";
}

// =============================================================================
// Payload DTOs
// =============================================================================

/// Public projection of a `User`, safe to hand to either client (no password
/// hash). Mirrors `get_user`/`register`/`login` responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub username: Username,
    pub level: u32,
    pub exp: u32,
    pub max_exp: u32,
    pub games_played: u32,
    pub games_won: u32,
    pub gold: u64,
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    pub session_id: SessionToken,
    pub user: UserView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchFoundData {
    pub room_id: RoomId,
    pub opponent: Username,
    pub mode: GameMode,
}

/// A single tower's client-facing status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TowerStatus {
    pub role: String,
    pub hp: f64,
    pub max_hp: f64,
    pub is_destroyed: bool,
}

/// A single live troop's client-facing status (tick mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TroopStatus {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub x: f64,
    pub y: f64,
    pub hp: f64,
    pub max_hp: f64,
}

/// A player's client-facing status, built from `Player` rather than
/// serialized directly — hides `last_mana_regen_at` and other server-only
/// bookkeeping (SPEC_FULL "Client status views" supplement).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub username: Username,
    pub mana: f64,
    pub towers: Vec<TowerStatus>,
    pub hand: Vec<String>,
    pub turn_count: u32,
}

/// Turn-mode game view: both players plus whose turn it is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnGameView {
    pub room_id: RoomId,
    pub player1: PlayerStatus,
    pub player2: PlayerStatus,
    pub turn: Username,
}

/// Tick-mode game view: both players, live troops, and time remaining.
/// `time_left_ms` is milliseconds, matching the wire contract (§4.9
/// `timeLeft = max(0, maxDuration - elapsed)` in milliseconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickGameView {
    pub room_id: RoomId,
    pub player1: PlayerStatus,
    pub player2: PlayerStatus,
    pub troops: Vec<TroopStatus>,
    pub time_left_ms: u64,
}

/// `get_game`/`game_state` response payload — one or the other branch
/// depending on the room's mode (SPEC_FULL "get_game reconnect-free state
/// fetch" supplement).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GameView {
    Turn(TurnGameView),
    Tick(TickGameView),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManaUpdateData {
    pub room_id: RoomId,
    pub username: Username,
    pub mana: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipTurnData {
    pub room_id: RoomId,
    pub skipped: Username,
    pub turn: Username,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOverData {
    pub room_id: RoomId,
    pub outcome: crate::enums::MatchOutcome,
}
