//! In-process credential store.
//!
//! Backs the test suites and local experiments. Each instance is isolated, so
//! tests never share state.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::AuthError;
use super::store::{SessionStore, UserStore};
use crate::models::auth::{NewSession, NewUser, Session, User, UserUpdate, UserWithPassword};

#[derive(Debug, Default)]
struct Inner {
    users: Vec<UserWithPassword>,
    sessions: HashMap<String, Session>,
    next_user_id: i64,
    next_session_id: i64,
}

/// [`UserStore`] + [`SessionStore`] held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.user.username == username)
            .cloned())
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.user.email == email).cloned())
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.user.id == user_id)
            .map(|u| u.user.clone()))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().any(|u| u.user.username == username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().any(|u| u.user.email == email))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AuthError> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.user.username == user.username) {
            return Err(AuthError::Conflict("Username already taken".into()));
        }
        if inner.users.iter().any(|u| u.user.email == user.email) {
            return Err(AuthError::Conflict("Email already registered".into()));
        }
        inner.next_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: inner.next_user_id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(UserWithPassword {
            user: created.clone(),
            password_hash: user.password_hash,
        });
        Ok(created)
    }

    async fn update_user(
        &self,
        user_id: i64,
        update: UserUpdate,
    ) -> Result<Option<User>, AuthError> {
        let mut inner = self.inner.write().await;
        let others = || inner.users.iter().filter(move |u| u.user.id != user_id);
        if let Some(username) = &update.username
            && others().any(|u| &u.user.username == username)
        {
            return Err(AuthError::Conflict("Username already taken".into()));
        }
        if let Some(email) = &update.email
            && others().any(|u| &u.user.email == email)
        {
            return Err(AuthError::Conflict("Email already registered".into()));
        }

        let Some(found) = inner.users.iter_mut().find(|u| u.user.id == user_id) else {
            return Ok(None);
        };
        let user = &mut found.user;
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if update.first_name.is_some() {
            user.first_name = update.first_name;
        }
        if update.last_name.is_some() {
            user.last_name = update.last_name;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: NewSession) -> Result<Session, AuthError> {
        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(&session.session_id) {
            return Err(AuthError::Conflict("Session token already exists".into()));
        }
        inner.next_session_id += 1;
        let created = Session {
            id: inner.next_session_id,
            session_id: session.session_id,
            user_id: session.user_id,
            ip: session.ip,
            user_agent: session.user_agent,
            expires_at: session.expires_at,
            revoked: false,
            created_at: Utc::now(),
        };
        inner
            .sessions
            .insert(created.session_id.clone(), created.clone());
        Ok(created)
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner.sessions.get(session_id).cloned())
    }

    async fn revoke_session(&self, session_id: &str) -> Result<bool, AuthError> {
        let mut inner = self.inner.write().await;
        Ok(match inner.sessions.get_mut(session_id) {
            Some(session) => {
                session.revoked = true;
                true
            }
            None => false,
        })
    }
}
