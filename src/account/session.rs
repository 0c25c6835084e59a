//! Session lifecycle: login, logout, refresh rotation, reads and profile
//! mutations.
//!
//! The session-cache entry keyed by user id is written here on every path
//! that changes the persisted record, and deleted on logout. Refresh trades
//! a valid refresh token plus a live cache entry for a fresh pair, so
//! deleting the entry revokes refresh even while the token itself is still
//! cryptographically valid.

use super::{
    email_looks_valid, CookieSpec, IssuedSession, PasswordHasher, ProfileUpdate, ACCESS_COOKIE,
    MIN_PASSWORD_LEN, REFRESH_COOKIE,
};
use crate::{
    cache::SessionCache,
    error::{AuthError, AuthResult},
    store::{User, UserStore, UserView},
    token::{TokenPair, TokenService},
};
use std::sync::Arc;

pub struct SessionManager {
    store: Arc<dyn UserStore>,
    cache: Arc<dyn SessionCache>,
    tokens: Arc<TokenService>,
    hasher: Arc<dyn PasswordHasher>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn UserStore>,
        cache: Arc<dyn SessionCache>,
        tokens: Arc<TokenService>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            store,
            cache,
            tokens,
            hasher,
        }
    }

    /// Authenticate and open a session.
    ///
    /// Unknown user, role mismatch and wrong password all surface the same
    /// `InvalidCredentials` so responses cannot be used to enumerate
    /// accounts.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        role: &str,
    ) -> AuthResult<IssuedSession> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Please enter the email and password".to_string(),
            ));
        }

        let user = match self.store.find_by_email(email).await? {
            Some(user) => user,
            None => return Err(AuthError::InvalidCredentials),
        };

        if user.role != role {
            return Err(AuthError::InvalidCredentials);
        }

        if !self.hasher.verify(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.tokens.issue_session_pair(&user.id)?;

        // The refresh contract depends on this entry existing, so the write
        // is part of login, not a best-effort afterthought.
        self.write_snapshot(&user).await?;

        tracing::info!(user_id = %user.id, "session opened");

        Ok(self.issued_session(user, pair))
    }

    /// Close the current session: revoke refresh and clear both cookies.
    /// Idempotent — logging out twice is not an error.
    pub async fn logout(&self, user_id: &str) -> AuthResult<Vec<CookieSpec>> {
        self.cache.delete(user_id).await?;

        tracing::info!(user_id = %user_id, "session closed");

        Ok(vec![
            CookieSpec::expired(ACCESS_COOKIE),
            CookieSpec::expired(REFRESH_COOKIE),
        ])
    }

    /// Exchange a refresh token for a fresh pair. Rotation is unconditional;
    /// the only gate beyond the signature is the live cache entry.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<IssuedSession> {
        let claims = self.tokens.verify_refresh(refresh_token)?;

        let snapshot = match self.cache.get(&claims.id).await? {
            Some(snapshot) => snapshot,
            None => {
                tracing::debug!(user_id = %claims.id, "refresh without live session entry");
                return Err(AuthError::InvalidToken);
            }
        };

        let user: User = serde_json::from_str(&snapshot)
            .map_err(|e| AuthError::Internal(format!("Corrupt session snapshot: {e}")))?;

        let pair = self.tokens.issue_session_pair(&user.id)?;
        self.write_snapshot(&user).await?;

        tracing::debug!(user_id = %user.id, "session tokens rotated");

        Ok(self.issued_session(user, pair))
    }

    /// Cache-first read of the current user. The cache is a read
    /// accelerator: a miss, a cache error or a corrupt snapshot all fall
    /// back to the store.
    pub async fn current_user(&self, user_id: &str) -> AuthResult<UserView> {
        match self.cache.get(user_id).await {
            Ok(Some(snapshot)) => {
                if let Ok(user) = serde_json::from_str::<User>(&snapshot) {
                    return Ok(user.view());
                }
                tracing::warn!(user_id = %user_id, "dropping corrupt session snapshot");
                let _ = self.cache.delete(user_id).await;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "session cache read failed");
            }
        }

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

        if let Err(e) = self.write_snapshot(&user).await {
            tracing::warn!(user_id = %user_id, error = %e, "session snapshot backfill failed");
        }

        Ok(user.view())
    }

    /// Update name and/or email, then overwrite the cache snapshot. Cache and
    /// store must not diverge once this returns successfully.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> AuthResult<UserView> {
        let mut user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

        if let Some(email) = update.email {
            if !email_looks_valid(&email) {
                return Err(AuthError::InvalidInput(
                    "Please enter a valid email address".to_string(),
                ));
            }
            if let Some(existing) = self.store.find_by_email(&email).await? {
                if existing.id != user.id {
                    return Err(AuthError::Conflict("Email already exists".to_string()));
                }
            }
            user.email = email;
        }

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(AuthError::InvalidInput("Name cannot be empty".to_string()));
            }
            user.name = name;
        }

        self.store.save(&user).await?;
        self.mirror_after_write(&user).await?;

        tracing::info!(user_id = %user.id, "profile updated");

        Ok(user.view())
    }

    /// Change the password after re-verifying the old one, then mirror the
    /// new record to the cache. The store write and the mirror are not
    /// transactional: a failed mirror surfaces as `CacheSync` even though
    /// the credential change already stuck.
    pub async fn update_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        if old_password.is_empty() || new_password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Please enter both the old and new passwords".to_string(),
            ));
        }
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }

        let mut user = match self.store.find_by_id(user_id).await? {
            Some(user) => user,
            None => return Err(AuthError::InvalidCredentials),
        };

        if !self.hasher.verify(old_password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        user.password_hash = self.hasher.hash(new_password)?;
        self.store.save(&user).await?;
        self.mirror_after_write(&user).await?;

        tracing::info!(user_id = %user.id, "password updated");

        Ok(())
    }

    fn issued_session(&self, user: User, pair: TokenPair) -> IssuedSession {
        let cookies = vec![
            CookieSpec::session(
                ACCESS_COOKIE,
                pair.access.clone(),
                self.tokens.access_ttl().num_seconds(),
            ),
            CookieSpec::session(
                REFRESH_COOKIE,
                pair.refresh.clone(),
                self.tokens.refresh_ttl().num_seconds(),
            ),
        ];

        IssuedSession {
            user: user.view(),
            tokens: pair,
            cookies,
        }
    }

    async fn write_snapshot(&self, user: &User) -> AuthResult<()> {
        let snapshot = serde_json::to_string(user)
            .map_err(|e| AuthError::Internal(format!("Snapshot serialization failed: {e}")))?;
        self.cache.set(&user.id, snapshot).await
    }

    /// Snapshot write after a successful store write; failure here means the
    /// two have diverged.
    async fn mirror_after_write(&self, user: &User) -> AuthResult<()> {
        self.write_snapshot(user).await.map_err(|e| match e {
            AuthError::Cache(msg) => AuthError::CacheSync(msg),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::test_support::{FailingCache, TestHasher};
    use crate::cache::MemorySessionCache;
    use crate::clock::SystemClock;
    use crate::config::{SecretsConfig, TokenConfig};
    use crate::store::{MemoryUserStore, NewUser};

    fn secrets() -> SecretsConfig {
        SecretsConfig {
            activation: "activation-secret-0123456789abcdef".to_string(),
            access: "access-secret-0123456789abcdefghij".to_string(),
            refresh: "refresh-secret-0123456789abcdefghi".to_string(),
        }
    }

    struct Fixture {
        store: Arc<MemoryUserStore>,
        cache: Arc<MemorySessionCache>,
        manager: SessionManager,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryUserStore::new());
        let cache = Arc::new(MemorySessionCache::new());
        let tokens = Arc::new(TokenService::new(
            secrets(),
            TokenConfig::default(),
            Arc::new(SystemClock),
        ));
        let manager = SessionManager::new(
            store.clone(),
            cache.clone(),
            tokens,
            Arc::new(TestHasher),
        );
        Fixture {
            store,
            cache,
            manager,
        }
    }

    async fn seed_user(store: &MemoryUserStore) -> String {
        store
            .create(NewUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hashed:correct horse".to_string(),
                role: "user".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn login_issues_pair_and_writes_snapshot() {
        let fx = fixture();
        let user_id = seed_user(&fx.store).await;

        let session = fx
            .manager
            .login("ada@example.com", "correct horse", "user")
            .await
            .unwrap();

        assert_eq!(session.user.id, user_id);
        assert_eq!(session.cookies.len(), 2);
        assert!(fx.cache.get(&user_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn login_failures_are_uniform() {
        let fx = fixture();
        seed_user(&fx.store).await;

        for (email, password, role) in [
            ("nobody@example.com", "correct horse", "user"),
            ("ada@example.com", "wrong password", "user"),
            ("ada@example.com", "correct horse", "admin"),
        ] {
            match fx.manager.login(email, password, role).await {
                Err(AuthError::InvalidCredentials) => {}
                other => panic!("expected InvalidCredentials, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn refresh_rotates_tokens_while_session_lives() {
        let fx = fixture();
        seed_user(&fx.store).await;

        let session = fx
            .manager
            .login("ada@example.com", "correct horse", "user")
            .await
            .unwrap();

        let rotated = fx.manager.refresh(&session.tokens.refresh).await.unwrap();
        assert_ne!(rotated.tokens.access, session.tokens.access);
        assert_ne!(rotated.tokens.refresh, session.tokens.refresh);
    }

    #[tokio::test]
    async fn logout_revokes_refresh() {
        let fx = fixture();
        let user_id = seed_user(&fx.store).await;

        let session = fx
            .manager
            .login("ada@example.com", "correct horse", "user")
            .await
            .unwrap();

        let cookies = fx.manager.logout(&user_id).await.unwrap();
        assert!(cookies.iter().all(|c| c.max_age_secs == 0));

        // The token itself is still unexpired; only the cache entry is gone.
        let result = fx.manager.refresh(&session.tokens.refresh).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));

        // Logging out again is fine.
        assert!(fx.manager.logout(&user_id).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_rejects_garbage_tokens() {
        let fx = fixture();
        let result = fx.manager.refresh("not-a-token").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn current_user_falls_back_to_store_and_backfills() {
        let fx = fixture();
        let user_id = seed_user(&fx.store).await;

        assert!(fx.cache.get(&user_id).await.unwrap().is_none());

        let view = fx.manager.current_user(&user_id).await.unwrap();
        assert_eq!(view.email, "ada@example.com");
        assert!(fx.cache.get(&user_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn current_user_prefers_cache_read_errors_to_store() {
        let store = Arc::new(MemoryUserStore::new());
        let user_id = seed_user(&store).await;
        let tokens = Arc::new(TokenService::new(
            secrets(),
            TokenConfig::default(),
            Arc::new(SystemClock),
        ));
        let manager = SessionManager::new(
            store,
            Arc::new(FailingCache),
            tokens,
            Arc::new(TestHasher),
        );

        // Cache writes fail too, but the read path never depends on them.
        let view = manager.current_user(&user_id).await.unwrap();
        assert_eq!(view.email, "ada@example.com");
    }

    #[tokio::test]
    async fn update_profile_rewrites_snapshot() {
        let fx = fixture();
        let user_id = seed_user(&fx.store).await;
        fx.manager
            .login("ada@example.com", "correct horse", "user")
            .await
            .unwrap();

        let view = fx
            .manager
            .update_profile(
                &user_id,
                ProfileUpdate {
                    name: Some("Ada Lovelace".to_string()),
                    email: Some("countess@example.com".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.name, "Ada Lovelace");

        let snapshot = fx.cache.get(&user_id).await.unwrap().unwrap();
        let cached: User = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(cached.email, "countess@example.com");
    }

    #[tokio::test]
    async fn update_profile_conflicts_on_taken_email() {
        let fx = fixture();
        let user_id = seed_user(&fx.store).await;
        fx.store
            .create(NewUser {
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
                password_hash: "hashed:pw".to_string(),
                role: "user".to_string(),
            })
            .await
            .unwrap();

        let result = fx
            .manager
            .update_profile(
                &user_id,
                ProfileUpdate {
                    name: None,
                    email: Some("grace@example.com".to_string()),
                },
            )
            .await;
        assert!(matches!(result, Err(AuthError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_profile_keeping_own_email_is_not_a_conflict() {
        let fx = fixture();
        let user_id = seed_user(&fx.store).await;

        let view = fx
            .manager
            .update_profile(
                &user_id,
                ProfileUpdate {
                    name: Some("Ada Lovelace".to_string()),
                    email: Some("ada@example.com".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.email, "ada@example.com");
    }

    #[tokio::test]
    async fn short_new_password_is_rejected_unchanged() {
        let fx = fixture();
        let user_id = seed_user(&fx.store).await;

        let result = fx
            .manager
            .update_password(&user_id, "correct horse", "seven77")
            .await;
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));

        let stored = fx.store.find_by_id(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "hashed:correct horse");
    }

    #[tokio::test]
    async fn wrong_old_password_is_rejected() {
        let fx = fixture();
        let user_id = seed_user(&fx.store).await;

        let result = fx
            .manager
            .update_password(&user_id, "wrong", "long enough password")
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn password_update_with_broken_cache_reports_sync_failure() {
        let store = Arc::new(MemoryUserStore::new());
        let user_id = seed_user(&store).await;
        let tokens = Arc::new(TokenService::new(
            secrets(),
            TokenConfig::default(),
            Arc::new(SystemClock),
        ));
        let manager = SessionManager::new(
            store.clone(),
            Arc::new(FailingCache),
            tokens,
            Arc::new(TestHasher),
        );

        let result = manager
            .update_password(&user_id, "correct horse", "long enough password")
            .await;
        assert!(matches!(result, Err(AuthError::CacheSync(_))));

        // The credential change itself stuck.
        let stored = store.find_by_id(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "hashed:long enough password");
    }
}
