//! Persisted user accounts and the password-hashing boundary.
//!
//! Everything here is an external collaborator in the sense of §1: a single
//! JSON file on disk and an argon2 hash, with no opinions about sockets,
//! matchmaking, or game state.

mod error;
mod password;
mod user_store;

pub use error::{PasswordError, UserStoreError};
pub use password::{Argon2Hasher, PasswordHasher};
pub use user_store::{FileUserStore, UserStore};
