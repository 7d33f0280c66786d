//! Core types for the battle server — zero game logic, just data.
//!
//! This crate defines every type shared across the engine, the session
//! runtime, and the wire protocol: IDs, enums, mutable match state, and the
//! client/server message envelope. It has no game logic of its own.

pub mod enums;
pub mod ids;
pub mod protocol;
pub mod state;

pub use enums::*;
pub use ids::*;
