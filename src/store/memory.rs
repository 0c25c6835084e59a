//! In-memory user store for tests and local development.

use super::{NewUser, User, UserStore};
use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// HashMap-backed store with the same uniqueness behavior as the SQLite
/// adapter.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> AuthResult<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.get(id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> AuthResult<User> {
        let mut users = self.users.lock().unwrap();

        if users.values().any(|u| u.email == new_user.email) {
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
        users.insert(user.id.clone(), user.clone());

        Ok(user)
    }

    async fn save(&self, user: &User) -> AuthResult<()> {
        let mut users = self.users.lock().unwrap();

        if !users.contains_key(&user.id) {
            return Err(AuthError::NotFound("User not found".to_string()));
        }
        if users
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(AuthError::Conflict("Email already exists".to_string()));
        }

        users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ada".to_string(),
            email: email.to_string(),
            password_hash: "hashed:pw".to_string(),
            role: "user".to_string(),
        }
    }

    #[test]
    fn create_find_save() {
        let store = MemoryUserStore::new();

        let mut user = block_on(store.create(new_user("ada@example.com"))).unwrap();
        assert!(block_on(store.find_by_email("ada@example.com"))
            .unwrap()
            .is_some());

        user.name = "Ada Lovelace".to_string();
        block_on(store.save(&user)).unwrap();
        let reloaded = block_on(store.find_by_id(&user.id)).unwrap().unwrap();
        assert_eq!(reloaded.name, "Ada Lovelace");
    }

    #[test]
    fn duplicate_email_conflicts_on_create_and_save() {
        let store = MemoryUserStore::new();
        block_on(store.create(new_user("ada@example.com"))).unwrap();

        assert!(matches!(
            block_on(store.create(new_user("ada@example.com"))),
            Err(AuthError::Conflict(_))
        ));

        let mut other = block_on(store.create(new_user("grace@example.com"))).unwrap();
        other.email = "ada@example.com".to_string();
        assert!(matches!(
            block_on(store.save(&other)),
            Err(AuthError::Conflict(_))
        ));
    }
}
