//! Application context and dependency injection.
//!
//! Collaborators are built once at startup and shared behind `Arc`s; tests
//! substitute the in-memory adapters by constructing managers directly.

use crate::{
    account::{PasswordHasher, PasswordManager, RegistrationManager, SessionManager},
    cache::{CacheConfig, RedisSessionCache, SessionCache},
    clock::{Clock, SystemClock},
    config::AuthConfig,
    error::{AuthError, AuthResult},
    mailer::{Notifier, SmtpMailer, UnconfiguredNotifier},
    store::{SqliteUserStore, UserStore},
    token::TokenService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Shared service wiring.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AuthConfig>,
    pub registration: Arc<RegistrationManager>,
    pub sessions: Arc<SessionManager>,
    pub passwords: Arc<PasswordManager>,
}

impl AppContext {
    /// Build the production wiring: SQLite store (migrated on startup),
    /// Redis session cache, SMTP notifier, system clock. The password-hash
    /// primitive is the embedding application's and is injected.
    pub async fn new(
        config: AuthConfig,
        cache_config: CacheConfig,
        hasher: Arc<dyn PasswordHasher>,
    ) -> AuthResult<Self> {
        config.validate()?;

        let pool = SqlitePool::connect(&config.store.database_url)
            .await
            .map_err(|e| AuthError::Store(format!("Database connection failed: {e}")))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AuthError::Store(format!("Failed to run migrations: {e}")))?;

        let store: Arc<dyn UserStore> = Arc::new(SqliteUserStore::new(pool));
        let cache: Arc<dyn SessionCache> = Arc::new(RedisSessionCache::new(cache_config).await?);

        let notifier: Arc<dyn Notifier> = match &config.email {
            Some(email_config) => Arc::new(SmtpMailer::new(email_config)?),
            None => Arc::new(UnconfiguredNotifier),
        };

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tokens = Arc::new(TokenService::new(
            config.secrets.clone(),
            config.tokens.clone(),
            clock.clone(),
        ));

        let registration = Arc::new(RegistrationManager::new(
            store.clone(),
            tokens.clone(),
            notifier.clone(),
            hasher.clone(),
        ));
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            cache.clone(),
            tokens.clone(),
            hasher.clone(),
        ));
        let passwords = Arc::new(PasswordManager::new(
            store,
            tokens,
            notifier,
            hasher,
            clock,
            config.frontend.clone(),
        ));

        tracing::info!("authentication core initialized");

        Ok(Self {
            config: Arc::new(config),
            registration,
            sessions,
            passwords,
        })
    }
}
