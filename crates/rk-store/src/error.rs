use thiserror::Error;

/// Failure modes for the account store. `UserExists` is a `Conflict` in §7's
/// taxonomy; everything else that touches the filesystem is a `ConfigError`
/// (fatal at boot) or `IoError` (per-request, logged and surfaced as a
/// generic failure) depending on when it's raised.
#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("username {0:?} is already registered")]
    UserExists(String),

    #[error("failed to read {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("failed to parse {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
}

/// Failure hashing or verifying a password. The underlying argon2 details
/// never escape past this boundary (§1 Non-goals: password hashing
/// internals are out of scope, only this boundary is).
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password")]
    Hash,

    #[error("incorrect password")]
    Mismatch,
}
