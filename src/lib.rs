//! Keygate — authentication and session-lifecycle core.
//!
//! Issues, verifies and rotates signed tokens; runs a two-step registration
//! flow (signed activation token + emailed 4-digit code); runs a single-use
//! password-reset flow bound to per-user derived secrets; and owns the
//! session cache that both accelerates reads and revokes refresh tokens.
//!
//! HTTP routing, persistent storage engines beyond the shipped adapters,
//! and the password-hash primitive are the embedding application's concern;
//! they plug in through the traits in [`store`], [`cache`], [`mailer`],
//! [`clock`] and [`account::PasswordHasher`].

pub mod account;
pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod mailer;
pub mod store;
pub mod telemetry;
pub mod token;

pub use account::{PasswordManager, RegistrationManager, SessionManager};
pub use config::AuthConfig;
pub use context::AppContext;
pub use error::{AuthError, AuthResult};
