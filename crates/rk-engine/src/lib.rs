//! Game logic — combat math, movement, battle resolution, win checks.
//!
//! Every module here is pure: functions take explicit `GameState`/`Player`/
//! `Instant` arguments and return results or mutate through `&mut`. No
//! sockets, no timers, no locks — those live one layer up in `rk-session`.

pub mod battle_system;
pub mod combat_resolution;
pub mod combat_tick;
pub mod error;
pub mod mana;
pub mod movement;
pub mod setup;
pub mod spawn;
pub mod tick_engine;
pub mod turn_engine;
pub mod win_condition;

pub use error::EngineError;
