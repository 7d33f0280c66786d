//! The password-hashing boundary (§1 Non-goals: internals are out of scope,
//! only this boundary is in). Grounded on `auth.go`'s
//! `bcrypt.GenerateFromPassword`/`CompareHashAndPassword` pair, ported to
//! `argon2` since that's the hashing crate the rest of this ecosystem reaches
//! for over bcrypt.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::PasswordError;

/// Narrow seam so the rest of the crate depends on a trait, not a specific
/// KDF — swapping the hash algorithm later touches only this file.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, PasswordError>;
    fn verify(&self, password: &str, hash: &str) -> Result<(), PasswordError>;
}

#[derive(Debug, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|_| PasswordError::Hash)
    }

    fn verify(&self, password: &str, hash: &str) -> Result<(), PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::Hash)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| PasswordError::Mismatch)
    }
}
