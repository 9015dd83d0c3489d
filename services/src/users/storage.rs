//! User lookup for authenticated requests.
//!
//! Accounts are provisioned outside this service. Handlers only need to
//! resolve the username carried by a session token into the user's row:
//! - `UserStorage` trait: lookup interface
//! - `PgUserStorage`: PostgreSQL implementation sharing the `PgStorage` pool
//! - `MockUserStorage`: in-memory implementation for testing

use crate::database::PgStorage;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

/// A user row as seen by the board handlers.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredUser {
    pub id: i64,
    pub username: String,
    pub nickname: String,
    pub profile_image_url: Option<String>,
}

impl StoredUser {
    pub fn new(id: i64, username: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            nickname: nickname.into(),
            profile_image_url: None,
        }
    }

    pub fn with_profile_image(mut self, url: impl Into<String>) -> Self {
        self.profile_image_url = Some(url.into());
        self
    }
}

/// Error type for user storage operations.
#[derive(Debug, thiserror::Error)]
pub enum UserStorageError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

pub trait UserStorage: Clone + Send + Sync + 'static {
    /// The error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Retrieves a user by username, `None` when no such account exists.
    fn get_user(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<StoredUser>, Self::Error>> + Send;
}

/// In-memory user storage for tests.
///
/// Keep ids in step with the users registered on `MockSqlStorage` so that
/// boards and comments resolve their owners.
#[derive(Clone, Default)]
pub struct MockUserStorage {
    users: Arc<RwLock<HashMap<String, StoredUser>>>,
    fail_lookups: bool,
}

impl MockUserStorage {
    /// Creates a new empty `MockUserStorage`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `MockUserStorage` pre-populated with the given users.
    pub fn with_users<I>(users: I) -> Self
    where
        I: IntoIterator<Item = StoredUser>,
    {
        let map = users
            .into_iter()
            .map(|user| (user.username.clone(), user))
            .collect();

        Self {
            users: Arc::new(RwLock::new(map)),
            fail_lookups: false,
        }
    }

    /// Inserts a user into the storage (builder pattern).
    pub fn with_user(self, user: StoredUser) -> Self {
        self.users
            .write()
            .expect("lock poisoned")
            .insert(user.username.clone(), user);
        self
    }

    /// Every lookup fails with a storage error.
    pub fn failing() -> Self {
        Self {
            fail_lookups: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.users.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserStorage for MockUserStorage {
    type Error = UserStorageError;

    async fn get_user(&self, username: &str) -> Result<Option<StoredUser>, Self::Error> {
        if self.fail_lookups {
            return Err(UserStorageError::StorageError(
                "user lookup unavailable".to_owned(),
            ));
        }
        let users = self.users.read().expect("lock poisoned");
        Ok(users.get(username).cloned())
    }
}

/// PostgreSQL implementation of [`UserStorage`].
#[derive(Clone)]
pub struct PgUserStorage {
    storage: PgStorage,
}

impl PgUserStorage {
    /// Creates a new `PgUserStorage` instance wrapping the given `PgStorage`.
    pub fn new(storage: PgStorage) -> Self {
        Self { storage }
    }

    /// Returns a reference to the underlying `PgStorage`.
    pub fn inner(&self) -> &PgStorage {
        &self.storage
    }
}

impl UserStorage for PgUserStorage {
    type Error = UserStorageError;

    async fn get_user(&self, username: &str) -> Result<Option<StoredUser>, Self::Error> {
        sqlx::query_as::<_, StoredUser>(
            r#"
            SELECT id, username, nickname, profile_image_url
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.storage.pool)
        .await
        .map_err(|e| UserStorageError::StorageError(e.to_string()))
    }
}
