//! User management: accounts, passwords, session tokens and follows.

pub mod password;
pub mod routes;
pub mod session_auth;
pub mod storage;
pub mod subscriptions;
pub mod token;

pub use session_auth::{MaybeAuth, RequireAuth, SessionAuthError};
pub use storage::{MockUserStorage, NewUser, PgUserStorage, StoredUser, UserStorage, UserStorageError};
