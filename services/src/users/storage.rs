//! User storage trait and implementations.
//!
//! - `UserStorage`: interface used by the handlers
//! - `PgUserStorage`: PostgreSQL implementation sharing the `PgStorage` pool
//! - `MockUserStorage`: in-memory implementation for tests

use crate::database::PgStorage;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::{Arc, RwLock};

/// A registered user as persisted.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to register a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// Error type for user storage operations.
#[derive(Debug, thiserror::Error)]
pub enum UserStorageError {
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub trait UserStorage: Clone + Send + Sync + 'static {
    /// Fails with `UserAlreadyExists` when the email or username is taken.
    fn create_user(
        &self,
        user: NewUser,
    ) -> impl Future<Output = Result<StoredUser, UserStorageError>> + Send;

    fn get_user(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<StoredUser>, UserStorageError>> + Send;

    fn get_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<StoredUser>, UserStorageError>> + Send;

    /// Users ordered by id.
    fn list_users(
        &self,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<StoredUser>, UserStorageError>> + Send;

    fn users_count(&self) -> impl Future<Output = Result<i64, UserStorageError>> + Send;

    fn update_password_hash(
        &self,
        id: i64,
        password_hash: &str,
    ) -> impl Future<Output = Result<(), UserStorageError>> + Send;
}

const USER_COLUMNS: &str =
    "id, email, username, first_name, last_name, password_hash, created_at";

/// PostgreSQL implementation of `UserStorage`.
#[derive(Clone)]
pub struct PgUserStorage {
    storage: PgStorage,
}

impl PgUserStorage {
    pub fn new(storage: PgStorage) -> Self {
        Self { storage }
    }
}

fn map_insert_error(err: sqlx::Error) -> UserStorageError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            let field = match db.constraint() {
                Some(name) if name.contains("email") => "email",
                _ => "username",
            };
            UserStorageError::UserAlreadyExists(format!("a user with this {field} already exists"))
        }
        _ => UserStorageError::StorageError(err.to_string()),
    }
}

fn storage_error(err: sqlx::Error) -> UserStorageError {
    UserStorageError::StorageError(err.to_string())
}

impl UserStorage for PgUserStorage {
    async fn create_user(&self, user: NewUser) -> Result<StoredUser, UserStorageError> {
        sqlx::query_as::<_, StoredUser>(&format!(
            "INSERT INTO users (email, username, first_name, last_name, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .fetch_one(&self.storage.pool)
        .await
        .map_err(map_insert_error)
    }

    async fn get_user(&self, id: i64) -> Result<Option<StoredUser>, UserStorageError> {
        sqlx::query_as::<_, StoredUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.storage.pool)
            .await
            .map_err(storage_error)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<StoredUser>, UserStorageError> {
        sqlx::query_as::<_, StoredUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.storage.pool)
        .await
        .map_err(storage_error)
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<StoredUser>, UserStorageError> {
        sqlx::query_as::<_, StoredUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.storage.pool)
        .await
        .map_err(storage_error)
    }

    async fn users_count(&self) -> Result<i64, UserStorageError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.storage.pool)
            .await
            .map_err(storage_error)
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<(), UserStorageError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.storage.pool)
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(UserStorageError::UserNotFound(id.to_string()));
        }
        Ok(())
    }
}

/// In-memory implementation of `UserStorage` for testing.
#[derive(Clone, Default)]
pub struct MockUserStorage {
    users: Arc<RwLock<Vec<StoredUser>>>,
}

impl MockUserStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserStorage for MockUserStorage {
    async fn create_user(&self, user: NewUser) -> Result<StoredUser, UserStorageError> {
        let mut users = self.users.write().expect("lock poisoned");
        if users.iter().any(|u| u.email == user.email) {
            return Err(UserStorageError::UserAlreadyExists(
                "a user with this email already exists".to_owned(),
            ));
        }
        if users.iter().any(|u| u.username == user.username) {
            return Err(UserStorageError::UserAlreadyExists(
                "a user with this username already exists".to_owned(),
            ));
        }

        let id = users.last().map_or(1, |u| u.id + 1);
        let stored = StoredUser {
            id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.push(stored.clone());
        Ok(stored)
    }

    async fn get_user(&self, id: i64) -> Result<Option<StoredUser>, UserStorageError> {
        let users = self.users.read().expect("lock poisoned");
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<StoredUser>, UserStorageError> {
        let users = self.users.read().expect("lock poisoned");
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<StoredUser>, UserStorageError> {
        let users = self.users.read().expect("lock poisoned");
        Ok(users
            .iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn users_count(&self) -> Result<i64, UserStorageError> {
        let users = self.users.read().expect("lock poisoned");
        i64::try_from(users.len()).map_err(|e| UserStorageError::StorageError(e.to_string()))
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<(), UserStorageError> {
        let mut users = self.users.write().expect("lock poisoned");
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| UserStorageError::UserNotFound(id.to_string()))?;
        password_hash.clone_into(&mut user.password_hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            email: email.to_owned(),
            username: username.to_owned(),
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
            password_hash: "hash".to_owned(),
        }
    }

    #[tokio::test]
    async fn mock_assigns_sequential_ids() {
        let storage = MockUserStorage::new();
        let alice = storage.create_user(new_user("a@x.io", "alice")).await.unwrap();
        let bob = storage.create_user(new_user("b@x.io", "bob")).await.unwrap();

        assert_eq!(alice.id, 1);
        assert_eq!(bob.id, 2);
        assert_eq!(storage.users_count().await.unwrap(), 2);
        assert_eq!(
            storage.get_user_by_email("b@x.io").await.unwrap().map(|u| u.id),
            Some(2)
        );
    }

    #[tokio::test]
    async fn mock_rejects_duplicate_email_and_username() {
        let storage = MockUserStorage::new();
        storage.create_user(new_user("a@x.io", "alice")).await.unwrap();

        let same_email = storage.create_user(new_user("a@x.io", "other")).await;
        assert!(matches!(same_email, Err(UserStorageError::UserAlreadyExists(m)) if m.contains("email")));

        let same_name = storage.create_user(new_user("c@x.io", "alice")).await;
        assert!(matches!(same_name, Err(UserStorageError::UserAlreadyExists(m)) if m.contains("username")));
    }

    #[tokio::test]
    async fn mock_updates_password_hash() {
        let storage = MockUserStorage::new();
        let user = storage.create_user(new_user("a@x.io", "alice")).await.unwrap();

        storage.update_password_hash(user.id, "new-hash").await.unwrap();
        let reloaded = storage.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.password_hash, "new-hash");

        assert!(matches!(
            storage.update_password_hash(99, "x").await,
            Err(UserStorageError::UserNotFound(_))
        ));
    }
}
