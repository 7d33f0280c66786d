//! Register / login / get_user (§4.5).
//!
//! Grounded on `internal/network/auth.go`'s `handleRegister`/`handleLogin`/
//! `handleGetUser`: hash on register, verify + mint a short opaque token on
//! login, resolve token back to a user view on `get_user`. The original
//! persists sessions to `sessions.json`; here they live in an in-memory
//! `DashMap` instead (SPEC_FULL §Ambient stack — rooms and the registry are
//! already all in-memory, so a restart invalidating live sessions along
//! with live matches is consistent, not a regression).

use std::sync::Arc;

use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;

use rk_store::{PasswordHasher, UserStore};
use rk_types::ids::{SessionToken, UserId, Username};
use rk_types::protocol::UserView;
use rk_types::state::User;

use crate::error::SessionError;

const SESSION_TOKEN_LEN: usize = 8;

pub struct AuthService {
    user_store: Arc<dyn UserStore>,
    password_hasher: Arc<dyn PasswordHasher>,
    sessions: DashMap<SessionToken, Username>,
}

impl AuthService {
    pub fn new(user_store: Arc<dyn UserStore>, password_hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            user_store,
            password_hasher,
            sessions: DashMap::new(),
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<UserView, SessionError> {
        if username.is_empty() || password.is_empty() {
            return Err(SessionError::Input("username and password are required".to_string()));
        }
        let hash = self.password_hasher.hash(password)?;
        let user = User::new(UserId::new(username.to_string()), Username::from(username), hash);
        self.user_store.add_user(user.clone()).await?;
        Ok(user_view(&user))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(SessionToken, UserView), SessionError> {
        let mut user = self
            .user_store
            .find_by_username(username)
            .await?
            .ok_or(SessionError::Auth)?;

        self.password_hasher
            .verify(password, &user.password_hash)
            .map_err(|_| SessionError::Auth)?;

        user.last_login = chrono::Utc::now();
        self.user_store.save_one(user.clone()).await?;

        let token = mint_session_token();
        self.sessions.insert(token.clone(), user.username.clone());

        Ok((token, user_view(&user)))
    }

    pub async fn get_user(&self, session_id: &SessionToken) -> Result<UserView, SessionError> {
        let username = self
            .sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::UnknownSession)?;
        let user = self
            .user_store
            .find_by_username(username.as_str())
            .await?
            .ok_or(SessionError::UnknownSession)?;
        Ok(user_view(&user))
    }
}

fn mint_session_token() -> SessionToken {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect();
    SessionToken::new(token)
}

/// Public projection of a `User` (§4.5 `get_user`: `maxExp =
/// 100 * 1.5^(level-1)`).
fn user_view(user: &User) -> UserView {
    UserView {
        username: user.username.clone(),
        level: user.level,
        exp: user.exp,
        max_exp: User::max_exp_for_level(user.level),
        games_played: user.games_played,
        games_won: user.games_won,
        gold: user.gold,
        avatar: user.avatar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_store::{Argon2Hasher, FileUserStore};

    fn service() -> AuthService {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn UserStore> = Arc::new(FileUserStore::new(dir.path().join("users.json")));
        let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher);
        AuthService::new(store, hasher)
    }

    #[tokio::test]
    async fn registering_then_logging_in_succeeds() {
        let auth = service();
        auth.register("alice", "hunter2").await.unwrap();

        let (token, view) = auth.login("alice", "hunter2").await.unwrap();
        assert_eq!(view.username.as_str(), "alice");
        assert_eq!(view.level, 1);

        let fetched = auth.get_user(&token).await.unwrap();
        assert_eq!(fetched.username.as_str(), "alice");
    }

    #[tokio::test]
    async fn logging_in_with_the_wrong_password_is_rejected() {
        let auth = service();
        auth.register("bob", "correct-horse").await.unwrap();
        let err = auth.login("bob", "wrong").await.unwrap_err();
        assert!(matches!(err, SessionError::Auth));
    }

    #[tokio::test]
    async fn get_user_with_an_unknown_session_fails() {
        let auth = service();
        let err = auth.get_user(&SessionToken::new("bogus")).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSession));
    }
}
