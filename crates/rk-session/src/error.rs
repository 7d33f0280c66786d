//! Session-layer error kinds, matching §7's table exactly. `rk_engine::
//! EngineError` covers the `StateError`/`NotFound` cases that arise from
//! validating a command against live `GameState`; this enum adds the kinds
//! that only make sense once sockets, rooms, and accounts enter the
//! picture (`Conflict`, `AuthError`, room/session `NotFound`, `IoError`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Input(String),

    #[error("invalid username or password")]
    Auth,

    #[error("unknown session")]
    UnknownSession,

    #[error(transparent)]
    Engine(#[from] rk_engine::EngineError),

    #[error("room {0:?} not found")]
    RoomNotFound(String),

    #[error("you are not part of this match")]
    NotInRoom,

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] rk_store::UserStoreError),

    #[error(transparent)]
    Password(#[from] rk_store::PasswordError),

    #[error("write to socket failed")]
    Io,
}

impl SessionError {
    /// Every error kind replies `{success:false, message}` and leaves the
    /// socket open (§7) — this is the one place that text gets built, so
    /// handlers never format ad-hoc strings.
    pub fn client_message(&self) -> String {
        self.to_string()
    }
}
