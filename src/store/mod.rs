//! User persistence.
//!
//! The flows depend only on the [`UserStore`] trait; [`SqliteUserStore`] is
//! the production adapter and [`MemoryUserStore`] backs deterministic tests.

mod memory;
mod sqlite;

pub use memory::MemoryUserStore;
pub use sqlite::SqliteUserStore;

use crate::error::AuthResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record as persisted. The password hash and reset fields stay inside
/// the core (and its cache snapshots); [`UserView`] is the outward shape.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub reset_token: Option<String>,
    pub reset_expires: Option<DateTime<Utc>>,
}

impl User {
    /// Shape handed to the boundary layer; never carries credentials.
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            created_at: self.created_at,
        }
    }
}

/// Public projection of a user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Insert shape; the store assigns id and creation time.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// Abstract user store. Email uniqueness is the store's invariant: `create`
/// (and `save` with a changed email) fail with `Conflict` on a duplicate.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;
    async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>>;
    async fn create(&self, new_user: NewUser) -> AuthResult<User>;
    async fn save(&self, user: &User) -> AuthResult<()>;
}
