//! Stateless token signing and verification.
//!
//! Four token kinds, each with its own typed claims, secret and lifetime:
//! activation (pending registration + 4-digit code, 5 minutes), access
//! (60 minutes), refresh (3 days) and password reset (15 minutes, signed with
//! a per-user derived secret). Pure CPU-bound signing; no I/O.

use crate::{
    clock::Clock,
    config::{SecretsConfig, TokenConfig},
    error::{AuthError, AuthResult},
};
use chrono::Duration;
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Clock-skew allowance for `exp` checks, in seconds.
const LEEWAY_SECS: u64 = 30;

/// Verification failure, kept distinct internally so callers can log the
/// cause. Flows collapse both variants into the merged user-facing kind.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        tracing::debug!(cause = %err, "token verification failed");
        AuthError::InvalidToken
    }
}

/// Registration data awaiting activation. Never persisted; the signed
/// activation token is its only carrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Claims embedded in an activation token.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActivationClaims {
    pub user: PendingRegistration,
    pub code: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims shared by access and refresh tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id.
    pub id: String,
    /// Unique token id; makes every rotation produce fresh strings.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims embedded in a password-reset token.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetClaims {
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Freshly issued activation token and its out-of-band code. The token goes
/// back to the client; the code only ever travels by email.
#[derive(Debug, Clone)]
pub struct IssuedActivation {
    pub token: String,
    pub code: String,
}

/// Access/refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Stateless signing and verification service.
pub struct TokenService {
    secrets: SecretsConfig,
    ttls: TokenConfig,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secrets: SecretsConfig, ttls: TokenConfig, clock: Arc<dyn Clock>) -> Self {
        Self { secrets, ttls, clock }
    }

    /// Sign a pending registration together with a fresh 4-digit code.
    pub fn issue_activation(&self, pending: PendingRegistration) -> AuthResult<IssuedActivation> {
        let code = generate_activation_code();
        let (iat, exp) = self.window(Duration::minutes(self.ttls.activation_ttl_mins));

        let claims = ActivationClaims {
            user: pending,
            code: code.clone(),
            iat,
            exp,
        };
        let token = self.sign(&claims, &self.secrets.activation)?;

        Ok(IssuedActivation { token, code })
    }

    pub fn verify_activation(&self, token: &str) -> Result<ActivationClaims, TokenError> {
        verify(token, &self.secrets.activation)
    }

    /// Issue an access/refresh pair for a user id.
    pub fn issue_session_pair(&self, user_id: &str) -> AuthResult<TokenPair> {
        let access = self.issue_session_token(
            user_id,
            Duration::minutes(self.ttls.access_ttl_mins),
            &self.secrets.access,
        )?;
        let refresh = self.issue_session_token(
            user_id,
            Duration::days(self.ttls.refresh_ttl_days),
            &self.secrets.refresh,
        )?;

        Ok(TokenPair { access, refresh })
    }

    pub fn verify_access(&self, token: &str) -> Result<SessionClaims, TokenError> {
        verify(token, &self.secrets.access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<SessionClaims, TokenError> {
        verify(token, &self.secrets.refresh)
    }

    /// Per-user reset secret: the user id concatenated with the access
    /// secret. Deterministic, so confirmation can recompute it without any
    /// stored state.
    pub fn derive_reset_secret(&self, user_id: &str) -> String {
        format!("{}{}", user_id, self.secrets.access)
    }

    /// Sign a password-reset token against the derived per-user secret.
    pub fn issue_reset_token(&self, user_id: &str) -> AuthResult<String> {
        let (iat, exp) = self.window(Duration::minutes(self.ttls.reset_ttl_mins));
        let claims = ResetClaims {
            user_id: user_id.to_string(),
            iat,
            exp,
        };
        self.sign(&claims, &self.derive_reset_secret(user_id))
    }

    pub fn verify_reset(&self, token: &str, user_id: &str) -> Result<ResetClaims, TokenError> {
        verify(token, &self.derive_reset_secret(user_id))
    }

    /// Reset-token lifetime, for persisting the matching expiry timestamp.
    pub fn reset_ttl(&self) -> Duration {
        Duration::minutes(self.ttls.reset_ttl_mins)
    }

    /// Access-token lifetime, for cookie max-age.
    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.ttls.access_ttl_mins)
    }

    /// Refresh-token lifetime, for cookie max-age.
    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.ttls.refresh_ttl_days)
    }

    fn issue_session_token(
        &self,
        user_id: &str,
        ttl: Duration,
        secret: &str,
    ) -> AuthResult<String> {
        let (iat, exp) = self.window(ttl);
        let claims = SessionClaims {
            id: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat,
            exp,
        };
        self.sign(&claims, secret)
    }

    fn window(&self, ttl: Duration) -> (i64, i64) {
        let now = self.clock.now().timestamp();
        (now, now + ttl.num_seconds())
    }

    fn sign<C: Serialize>(&self, claims: &C, secret: &str) -> AuthResult<String> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Token signing failed: {e}")))
    }
}

fn verify<C: DeserializeOwned>(token: &str, secret: &str) -> Result<C, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = LEEWAY_SECS;
    validation.set_required_spec_claims(&["exp"]);

    decode::<C>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })
}

/// Four-digit numeric code, 1000..=9999.
fn generate_activation_code() -> String {
    rand::thread_rng().gen_range(1000..10000).to_string()
}
