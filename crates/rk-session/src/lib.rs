//! Session runtime: matchmaking, rooms, connections, and command dispatch
//! (§4, §5). Wraps `rk-engine`'s pure game logic with the concurrency,
//! timers, and wire protocol an actual server needs; `rk-types::state::
//! GameState` never leaves this crate except as the read-only views in
//! `views`.

pub mod auth;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod matchmaker;
pub mod registry;
pub mod room;
pub mod views;

pub use auth::AuthService;
pub use config::SessionConfig;
pub use connection::Connection;
pub use dispatcher::{run_connection, ServerState};
pub use error::SessionError;
pub use matchmaker::Matchmaker;
pub use registry::Registry;
pub use room::Room;
