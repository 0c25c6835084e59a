//! Account flows: registration, session lifecycle and password reset.
//!
//! Each manager is a stateless orchestrator over the injected collaborators
//! (store, cache, token service, notifier, clock, hasher). Shared outward
//! payload types live here, beside the managers.

mod password;
mod registration;
mod session;

pub use password::PasswordManager;
pub use registration::RegistrationManager;
pub use session::SessionManager;

use crate::error::AuthResult;
use crate::store::UserView;
use crate::token::TokenPair;
use serde::{Deserialize, Serialize};

/// Password policy floor, enforced on update and reset.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Role assigned to accounts materialized through activation.
pub const DEFAULT_ROLE: &str = "user";

/// Cookie names the boundary layer sets and clears.
pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// One-way credential primitive, injected by the embedding application.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> AuthResult<String>;
    fn verify(&self, plain: &str, hash: &str) -> AuthResult<bool>;
}

/// Cookie attributes returned as data; applying them is the HTTP layer's job.
#[derive(Debug, Clone, Serialize)]
pub struct CookieSpec {
    pub name: &'static str,
    pub value: String,
    /// Zero expires the cookie immediately (logout).
    pub max_age_secs: i64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl CookieSpec {
    pub(crate) fn session(name: &'static str, value: String, max_age_secs: i64) -> Self {
        Self {
            name,
            value,
            max_age_secs,
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
        }
    }

    pub(crate) fn expired(name: &'static str) -> Self {
        Self::session(name, String::new(), 0)
    }
}

/// Outcome of `register`: the token the client must echo back at activation.
/// The matching code travels only by email.
#[derive(Debug, Clone)]
pub struct IssuedRegistration {
    pub activation_token: String,
}

/// Outcome of `login` and `refresh`.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: UserView,
    pub tokens: TokenPair,
    pub cookies: Vec<CookieSpec>,
}

/// Partial profile mutation.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Minimal structural email check; real deliverability is the notifier's
/// problem.
pub(crate) fn email_looks_valid(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}
