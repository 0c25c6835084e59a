//! SQLite-backed user store using runtime queries.

use super::{NewUser, User, UserStore};
use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// User store over a SQLite pool.
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn email_exists(&self, email: &str) -> AuthResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(count > 0)
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, created_at, reset_token, reset_expires
             FROM users WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role, created_at, reset_token, reset_expires
             FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn create(&self, new_user: NewUser) -> AuthResult<User> {
        if self.email_exists(&new_user.email).await? {
            return Err(AuthError::Conflict("Email already exists".to_string()));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: Utc::now(),
            reset_token: None,
            reset_expires: None,
        };

        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, created_at, reset_token, reset_expires)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.created_at)
        .bind(&user.reset_token)
        .bind(user.reset_expires)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // Backstop for a registration racing this insert.
            if is_unique_violation(&e) {
                AuthError::Conflict("Email already exists".to_string())
            } else {
                store_err(e)
            }
        })?;

        Ok(user)
    }

    async fn save(&self, user: &User) -> AuthResult<()> {
        let result = sqlx::query(
            "UPDATE users
             SET name = ?1, email = ?2, password_hash = ?3, role = ?4,
                 reset_token = ?5, reset_expires = ?6
             WHERE id = ?7",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(&user.reset_token)
        .bind(user.reset_expires)
        .bind(&user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::Conflict("Email already exists".to_string())
            } else {
                store_err(e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("User not found".to_string()));
        }

        Ok(())
    }
}

fn store_err(e: sqlx::Error) -> AuthError {
    AuthError::Store(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
