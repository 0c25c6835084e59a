//! Password reset: emailed link, then single-use confirmation.
//!
//! The reset token is signed with a secret derived from the user id and the
//! access secret, so it can be re-verified without storing the secret. The
//! token string and its expiry are also persisted on the record; a new
//! request overwrites them, which is what invalidates an older,
//! still-unexpired token despite it re-verifying cryptographically.

use super::{PasswordHasher, MIN_PASSWORD_LEN};
use crate::{
    clock::Clock,
    config::FrontendConfig,
    error::{AuthError, AuthResult},
    mailer::{Email, MailTemplate, Notifier},
    store::UserStore,
    token::TokenService,
};
use std::sync::Arc;

pub struct PasswordManager {
    store: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    notifier: Arc<dyn Notifier>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    frontend: FrontendConfig,
}

impl PasswordManager {
    pub fn new(
        store: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        notifier: Arc<dyn Notifier>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
        frontend: FrontendConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            notifier,
            hasher,
            clock,
            frontend,
        }
    }

    /// Issue a reset token, persist it with its expiry, and mail the link.
    ///
    /// A failed send surfaces as a delivery error; the persisted token stays
    /// in place and simply expires.
    pub async fn request_reset(&self, email: &str) -> AuthResult<()> {
        if email.is_empty() {
            return Err(AuthError::InvalidInput(
                "Please enter your email address".to_string(),
            ));
        }

        let mut user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or_else(|| {
                AuthError::NotFound("No account found with that email address".to_string())
            })?;

        let token = self.tokens.issue_reset_token(&user.id)?;

        user.reset_token = Some(token.clone());
        user.reset_expires = Some(self.clock.now() + self.tokens.reset_ttl());
        self.store.save(&user).await?;

        let reset_link = format!(
            "{}/account/reset-password-confirm/{}/{}",
            self.frontend.host, user.id, token
        );

        self.notifier
            .send(Email {
                to: user.email.clone(),
                template: MailTemplate::PasswordReset {
                    name: user.name.clone(),
                    reset_link,
                },
            })
            .await?;

        tracing::info!(user_id = %user.id, "password reset link issued");

        Ok(())
    }

    /// Confirm a reset. The token must verify against the re-derived secret
    /// AND equal the stored string AND the stored expiry must not have
    /// passed; every failure surfaces the same merged kind.
    pub async fn confirm_reset(
        &self,
        user_id: &str,
        token: &str,
        password: &str,
        confirm_password: &str,
    ) -> AuthResult<()> {
        if user_id.is_empty() || token.is_empty() {
            return Err(AuthError::InvalidInput(
                "Missing user id or reset token".to_string(),
            ));
        }
        if password.is_empty() || confirm_password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Please enter both the new password and confirmation password".to_string(),
            ));
        }
        if password != confirm_password {
            return Err(AuthError::InvalidInput(
                "The passwords do not match".to_string(),
            ));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }

        let mut user = match self.store.find_by_id(user_id).await? {
            Some(user) => user,
            None => {
                tracing::debug!(user_id = %user_id, "reset confirmation for unknown user");
                return Err(AuthError::InvalidToken);
            }
        };

        let (stored_token, stored_expires) = match (&user.reset_token, user.reset_expires) {
            (Some(stored_token), Some(stored_expires)) => (stored_token.clone(), stored_expires),
            _ => {
                tracing::debug!(user_id = %user.id, "reset confirmation without pending reset");
                return Err(AuthError::InvalidToken);
            }
        };

        self.tokens.verify_reset(token, &user.id)?;

        if self.clock.now() > stored_expires {
            tracing::debug!(user_id = %user.id, "reset token past stored expiry");
            return Err(AuthError::InvalidToken);
        }

        // Exact-string match against the stored value; a newer reset request
        // supersedes this token even though it still verifies.
        if stored_token != token {
            tracing::debug!(user_id = %user.id, "reset token superseded");
            return Err(AuthError::InvalidToken);
        }

        user.password_hash = self.hasher.hash(password)?;
        user.reset_token = None;
        user.reset_expires = None;
        self.store.save(&user).await?;

        tracing::info!(user_id = %user.id, "password reset completed");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::test_support::{FailingNotifier, RecordingNotifier, TestHasher};
    use crate::clock::FixedClock;
    use crate::config::{SecretsConfig, TokenConfig};
    use crate::store::{MemoryUserStore, NewUser};
    use chrono::{Duration, Utc};

    fn secrets() -> SecretsConfig {
        SecretsConfig {
            activation: "activation-secret-0123456789abcdef".to_string(),
            access: "access-secret-0123456789abcdefghij".to_string(),
            refresh: "refresh-secret-0123456789abcdefghi".to_string(),
        }
    }

    struct Fixture {
        store: Arc<MemoryUserStore>,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<FixedClock>,
        manager: PasswordManager,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryUserStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let tokens = Arc::new(TokenService::new(
            secrets(),
            TokenConfig::default(),
            clock.clone(),
        ));
        let manager = PasswordManager::new(
            store.clone(),
            tokens,
            notifier.clone(),
            Arc::new(TestHasher),
            clock.clone(),
            FrontendConfig {
                host: "https://app.example.com".to_string(),
            },
        );
        Fixture {
            store,
            notifier,
            clock,
            manager,
        }
    }

    async fn seed_user(store: &MemoryUserStore) -> String {
        store
            .create(NewUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hashed:old password".to_string(),
                role: "user".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    fn token_from_link(link: &str) -> String {
        link.rsplit('/').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn request_then_confirm_resets_and_clears_fields() {
        let fx = fixture();
        let user_id = seed_user(&fx.store).await;

        fx.manager.request_reset("ada@example.com").await.unwrap();

        let link = fx.notifier.last_reset_link().unwrap();
        assert!(link.starts_with(&format!(
            "https://app.example.com/account/reset-password-confirm/{user_id}/"
        )));
        let token = token_from_link(&link);

        fx.manager
            .confirm_reset(&user_id, &token, "new password!", "new password!")
            .await
            .unwrap();

        let stored = fx.store.find_by_id(&user_id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "hashed:new password!");
        assert!(stored.reset_token.is_none());
        assert!(stored.reset_expires.is_none());
    }

    #[tokio::test]
    async fn replaying_a_used_token_fails() {
        let fx = fixture();
        let user_id = seed_user(&fx.store).await;

        fx.manager.request_reset("ada@example.com").await.unwrap();
        let token = token_from_link(&fx.notifier.last_reset_link().unwrap());

        fx.manager
            .confirm_reset(&user_id, &token, "new password!", "new password!")
            .await
            .unwrap();

        let result = fx
            .manager
            .confirm_reset(&user_id, &token, "another pass!", "another pass!")
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn expired_window_rejects_a_structurally_valid_token() {
        let fx = fixture();
        let user_id = seed_user(&fx.store).await;

        fx.manager.request_reset("ada@example.com").await.unwrap();
        let token = token_from_link(&fx.notifier.last_reset_link().unwrap());

        fx.clock.advance(Duration::minutes(16));

        let result = fx
            .manager
            .confirm_reset(&user_id, &token, "new password!", "new password!")
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn newer_request_supersedes_older_token() {
        let fx = fixture();
        let user_id = seed_user(&fx.store).await;

        fx.manager.request_reset("ada@example.com").await.unwrap();
        let old_token = token_from_link(&fx.notifier.last_reset_link().unwrap());

        // Different iat so the second token is a different string.
        fx.clock.advance(Duration::seconds(2));
        fx.manager.request_reset("ada@example.com").await.unwrap();

        // The old token still verifies cryptographically, but no longer
        // matches the stored string.
        let result = fx
            .manager
            .confirm_reset(&user_id, &old_token, "new password!", "new password!")
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let fx = fixture();
        let user_id = seed_user(&fx.store).await;

        fx.manager.request_reset("ada@example.com").await.unwrap();
        let mut token = token_from_link(&fx.notifier.last_reset_link().unwrap());
        token.pop();
        token.push('x');

        let result = fx
            .manager
            .confirm_reset(&user_id, &token, "new password!", "new password!")
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let fx = fixture();
        let result = fx.manager.request_reset("nobody@example.com").await;
        assert!(matches!(result, Err(AuthError::NotFound(_))));
    }

    #[tokio::test]
    async fn failed_delivery_keeps_the_persisted_token() {
        let store = Arc::new(MemoryUserStore::new());
        let user_id = seed_user(&store).await;
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let tokens = Arc::new(TokenService::new(
            secrets(),
            TokenConfig::default(),
            clock.clone(),
        ));
        let manager = PasswordManager::new(
            store.clone(),
            tokens,
            Arc::new(FailingNotifier),
            Arc::new(TestHasher),
            clock,
            FrontendConfig {
                host: "https://app.example.com".to_string(),
            },
        );

        let result = manager.request_reset("ada@example.com").await;
        assert!(matches!(result, Err(AuthError::Delivery(_))));

        // Undeliverable but persisted; it will expire on its own.
        let stored = store.find_by_id(&user_id).await.unwrap().unwrap();
        assert!(stored.reset_token.is_some());
        assert!(stored.reset_expires.is_some());
    }

    #[tokio::test]
    async fn confirm_validates_input_before_touching_the_store() {
        let fx = fixture();

        assert!(matches!(
            fx.manager.confirm_reset("", "tok", "pw123456", "pw123456").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            fx.manager
                .confirm_reset("id", "tok", "pw123456", "different")
                .await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            fx.manager.confirm_reset("id", "tok", "seven77", "seven77").await,
            Err(AuthError::WeakPassword(_))
        ));
    }
}
