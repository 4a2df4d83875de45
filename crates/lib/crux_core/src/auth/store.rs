//! Storage seams for the auth core.
//!
//! The core never talks to a database directly. It is handed something that
//! implements these traits: [`PgStore`](super::queries::PgStore) in
//! production, [`MemoryStore`](super::memory::MemoryStore) in tests.

use async_trait::async_trait;

use super::AuthError;
use crate::models::auth::{NewSession, NewUser, Session, User, UserUpdate, UserWithPassword};

/// User records. Lookups take already-normalised identifiers.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserWithPassword>, AuthError>;

    async fn find_user_by_email(&self, email: &str)
    -> Result<Option<UserWithPassword>, AuthError>;

    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>, AuthError>;

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError>;

    /// Insert a user. A duplicate username or email is `AuthError::Conflict`.
    async fn create_user(&self, user: NewUser) -> Result<User, AuthError>;

    /// Apply `update` and bump `updated_at`. `None` when no such user exists;
    /// a username or email held by another user is `AuthError::Conflict`.
    async fn update_user(&self, user_id: i64, update: UserUpdate)
    -> Result<Option<User>, AuthError>;
}

/// Session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: NewSession) -> Result<Session, AuthError>;

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>, AuthError>;

    /// Set `revoked = true`. Returns whether a row matched.
    async fn revoke_session(&self, session_id: &str) -> Result<bool, AuthError>;
}

/// Everything the auth flows need from storage.
pub trait CredentialStore: UserStore + SessionStore {}

impl<T: UserStore + SessionStore> CredentialStore for T {}
