//! Persisted accounts (§4.2). Grounded on `internal/player/store.go`'s
//! `LoadPlayers`/`SavePlayers`/`AddPlayer`/`FindPlayerByUsername`: one JSON
//! file, one mutex around every read-modify-write, truncate-and-rewrite on
//! save. The mutex here is `tokio::sync::Mutex` rather than `sync.Mutex`
//! since every caller already runs inside the async server.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use rk_types::state::User;

use crate::error::UserStoreError;

/// Persistence contract for accounts. A trait rather than a bare struct so
/// the matchmaker/auth handlers in `rk-session` can hold it as
/// `Arc<dyn UserStore>` and be tested against an in-memory double without
/// touching the filesystem.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn load(&self) -> Result<Vec<User>, UserStoreError>;
    async fn save(&self, users: Vec<User>) -> Result<(), UserStoreError>;
    async fn add_user(&self, user: User) -> Result<(), UserStoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError>;
    async fn save_one(&self, user: User) -> Result<(), UserStoreError>;
}

/// Single-file JSON account store, guarded by one process-wide mutex so
/// concurrent register/login/match-conclusion writes never interleave
/// (§4.2, §5 "User store").
pub struct FileUserStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileUserStore {
    /// `path` need not exist yet — the first `save` creates it (and its
    /// parent directory), matching `InitStorage`'s create-if-missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    fn read_unlocked(&self) -> Result<Vec<User>, UserStoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = std::fs::read(&self.path).map_err(|source| UserStoreError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|source| UserStoreError::Parse {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn write_unlocked(&self, users: &[User]) -> Result<(), UserStoreError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|source| UserStoreError::Io {
                    path: dir.display().to_string(),
                    source,
                })?;
            }
        }
        let data = serde_json::to_vec_pretty(users).map_err(|source| UserStoreError::Parse {
            path: self.path.display().to_string(),
            source,
        })?;
        std::fs::write(&self.path, data).map_err(|source| UserStoreError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}

#[async_trait]
impl UserStore for FileUserStore {
    async fn load(&self) -> Result<Vec<User>, UserStoreError> {
        let _guard = self.lock.lock().await;
        self.read_unlocked()
    }

    async fn save(&self, users: Vec<User>) -> Result<(), UserStoreError> {
        let _guard = self.lock.lock().await;
        self.write_unlocked(&users)
    }

    async fn add_user(&self, user: User) -> Result<(), UserStoreError> {
        let _guard = self.lock.lock().await;
        let mut users = self.read_unlocked()?;
        if users.iter().any(|u| u.username == user.username) {
            return Err(UserStoreError::UserExists(user.username.to_string()));
        }
        users.push(user);
        self.write_unlocked(&users)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError> {
        let _guard = self.lock.lock().await;
        let users = self.read_unlocked()?;
        Ok(users.into_iter().find(|u| u.username.as_str() == username))
    }

    async fn save_one(&self, user: User) -> Result<(), UserStoreError> {
        let _guard = self.lock.lock().await;
        let mut users = self.read_unlocked()?;
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => users.push(user),
        }
        self.write_unlocked(&users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rk_types::ids::UserId;
    use rk_types::ids::Username;

    fn dummy(username: &str) -> User {
        User::new(UserId::new(username.to_string()), Username::from(username), "hash".into())
    }

    #[tokio::test]
    async fn a_missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileUserStore::new(dir.path().join("users.json"));
        assert_eq!(store.load().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn adding_a_duplicate_username_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileUserStore::new(dir.path().join("users.json"));
        store.add_user(dummy("alice")).await.unwrap();

        let err = store.add_user(dummy("alice")).await.unwrap_err();
        assert!(matches!(err, UserStoreError::UserExists(_)));
    }

    #[tokio::test]
    async fn find_by_username_locates_a_saved_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileUserStore::new(dir.path().join("users.json"));
        store.add_user(dummy("bob")).await.unwrap();

        let found = store.find_by_username("bob").await.unwrap();
        assert!(found.is_some());
        assert!(store.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_one_updates_an_existing_record_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileUserStore::new(dir.path().join("users.json"));
        let mut user = dummy("carol");
        store.add_user(user.clone()).await.unwrap();

        user.gold = 500;
        store.save_one(user).await.unwrap();

        let users = store.load().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].gold, 500);
    }
}
