//! Auth-related database queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::AuthError;
use super::store::{SessionStore, UserStore};
use crate::models::auth::{NewSession, NewUser, Session, User, UserUpdate, UserWithPassword};

/// (id, username, email, password_hash, first_name, last_name, created_at, updated_at)
type UserRow = (
    i64,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// (id, session_id, user_id, ip, user_agent, expires_at, revoked, created_at)
type SessionRow = (
    i64,
    String,
    i64,
    String,
    String,
    DateTime<Utc>,
    bool,
    DateTime<Utc>,
);

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, created_at, updated_at";

const SESSION_COLUMNS: &str =
    "id, session_id, user_id, ip, user_agent, expires_at, revoked, created_at";

fn user_from_row(row: UserRow) -> UserWithPassword {
    let (id, username, email, password_hash, first_name, last_name, created_at, updated_at) = row;
    UserWithPassword {
        user: User {
            id,
            username,
            email,
            first_name,
            last_name,
            created_at,
            updated_at,
        },
        password_hash,
    }
}

fn session_from_row(row: SessionRow) -> Session {
    let (id, session_id, user_id, ip, user_agent, expires_at, revoked, created_at) = row;
    Session {
        id,
        session_id,
        user_id,
        ip,
        user_agent,
        expires_at,
        revoked,
        created_at,
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to `DbError`.
fn conflict_or_db(e: sqlx::Error, message: &str) -> AuthError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AuthError::Conflict(message.to_string())
        }
        _ => AuthError::DbError(e),
    }
}

/// PostgreSQL-backed credential store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_user_where(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(user_from_row))
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        self.find_user_where("username", username).await
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        self.find_user_where("email", email).await
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| user_from_row(r).user))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AuthError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or_db(e, "Username or email already registered"))?;
        Ok(user_from_row(row).user)
    }

    async fn update_user(
        &self,
        user_id: i64,
        update: UserUpdate,
    ) -> Result<Option<User>, AuthError> {
        let sql = format!(
            "UPDATE users SET \
               username = COALESCE($2, username), \
               email = COALESCE($3, email), \
               first_name = COALESCE($4, first_name), \
               last_name = COALESCE($5, last_name), \
               updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id)
            .bind(&update.username)
            .bind(&update.email)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_or_db(e, "Username or email already registered"))?;
        Ok(row.map(|r| user_from_row(r).user))
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, session: NewSession) -> Result<Session, AuthError> {
        let sql = format!(
            "INSERT INTO sessions (session_id, user_id, ip, user_agent, expires_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SESSION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(&session.session_id)
            .bind(session.user_id)
            .bind(&session.ip)
            .bind(&session.user_agent)
            .bind(session.expires_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or_db(e, "Session token already exists"))?;
        Ok(session_from_row(row))
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>, AuthError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = $1");
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(session_from_row))
    }

    async fn revoke_session(&self, session_id: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("UPDATE sessions SET revoked = TRUE WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
