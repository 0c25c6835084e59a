//! Configuration management for the Keygate core.

use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub secrets: SecretsConfig,
    pub tokens: TokenConfig,
    pub frontend: FrontendConfig,
    pub store: StoreConfig,
    pub email: Option<EmailConfig>,
}

/// Signing secrets, one per token kind. The reset secret is derived per user
/// from the access secret and is not configured separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    pub activation: String,
    pub access: String,
    pub refresh: String,
}

/// Token lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub activation_ttl_mins: i64,
    pub access_ttl_mins: i64,
    pub refresh_ttl_days: i64,
    pub reset_ttl_mins: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            activation_ttl_mins: 5,
            access_ttl_mins: 60,
            refresh_ttl_days: 3,
            reset_ttl_mins: 15,
        }
    }
}

/// Frontend host used to build password-reset links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    pub host: String,
}

/// User store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database_url: String,
}

/// SMTP configuration. Absent means outbound mail is unconfigured and any
/// flow that must deliver mail fails with a delivery error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

impl AuthConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> AuthResult<Self> {
        dotenv::dotenv().ok();

        let activation = env::var("KEYGATE_ACTIVATION_SECRET")
            .map_err(|_| AuthError::InvalidInput("Activation secret required".to_string()))?;
        let access = env::var("KEYGATE_ACCESS_SECRET")
            .map_err(|_| AuthError::InvalidInput("Access secret required".to_string()))?;
        let refresh = env::var("KEYGATE_REFRESH_SECRET")
            .map_err(|_| AuthError::InvalidInput("Refresh secret required".to_string()))?;

        let defaults = TokenConfig::default();
        let activation_ttl_mins = env_i64("KEYGATE_ACTIVATION_TTL_MINS", defaults.activation_ttl_mins);
        let access_ttl_mins = env_i64("KEYGATE_ACCESS_TTL_MINS", defaults.access_ttl_mins);
        let refresh_ttl_days = env_i64("KEYGATE_REFRESH_TTL_DAYS", defaults.refresh_ttl_days);
        let reset_ttl_mins = env_i64("KEYGATE_RESET_TTL_MINS", defaults.reset_ttl_mins);

        let host = env::var("KEYGATE_FRONTEND_HOST")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://keygate.sqlite".to_string());

        let email = if let Ok(smtp_url) = env::var("KEYGATE_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("KEYGATE_EMAIL_FROM")
                    .unwrap_or_else(|_| "noreply@localhost".to_string()),
            })
        } else {
            None
        };

        let config = Self {
            secrets: SecretsConfig {
                activation,
                access,
                refresh,
            },
            tokens: TokenConfig {
                activation_ttl_mins,
                access_ttl_mins,
                refresh_ttl_days,
                reset_ttl_mins,
            },
            frontend: FrontendConfig { host },
            store: StoreConfig { database_url },
            email,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> AuthResult<()> {
        for (name, secret) in [
            ("activation", &self.secrets.activation),
            ("access", &self.secrets.access),
            ("refresh", &self.secrets.refresh),
        ] {
            if secret.len() < 32 {
                return Err(AuthError::InvalidInput(format!(
                    "{name} secret must be at least 32 characters"
                )));
            }
        }

        // Each token kind must be unforgeable from the others.
        if self.secrets.activation == self.secrets.access
            || self.secrets.activation == self.secrets.refresh
            || self.secrets.access == self.secrets.refresh
        {
            return Err(AuthError::InvalidInput(
                "Signing secrets must be pairwise distinct".to_string(),
            ));
        }

        let ttls = [
            self.tokens.activation_ttl_mins,
            self.tokens.access_ttl_mins,
            self.tokens.refresh_ttl_days,
            self.tokens.reset_ttl_mins,
        ];
        if ttls.iter().any(|ttl| *ttl <= 0) {
            return Err(AuthError::InvalidInput(
                "Token lifetimes must be positive".to_string(),
            ));
        }

        if self.frontend.host.is_empty() {
            return Err(AuthError::InvalidInput(
                "Frontend host cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
