//! Two-step registration: submit, then activate with an emailed code.
//!
//! No user row exists until activation succeeds; the signed activation token
//! carries the pending registration and the code, so nothing is stored in
//! the meantime.

use super::{email_looks_valid, IssuedRegistration, PasswordHasher, DEFAULT_ROLE};
use crate::{
    error::{AuthError, AuthResult},
    mailer::{Email, MailTemplate, Notifier},
    store::{NewUser, UserStore, UserView},
    token::{PendingRegistration, TokenService},
};
use std::sync::Arc;

pub struct RegistrationManager {
    store: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    notifier: Arc<dyn Notifier>,
    hasher: Arc<dyn PasswordHasher>,
}

impl RegistrationManager {
    pub fn new(
        store: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        notifier: Arc<dyn Notifier>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            store,
            tokens,
            notifier,
            hasher,
        }
    }

    /// Start a registration: issue an activation token and email its code.
    ///
    /// A failed send fails the whole operation — a token whose code never
    /// reached an inbox is useless, so the client retries from scratch.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<IssuedRegistration> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Name, email and password are required".to_string(),
            ));
        }
        if !email_looks_valid(email) {
            return Err(AuthError::InvalidInput(
                "Please enter a valid email address".to_string(),
            ));
        }

        if self.store.find_by_email(email).await?.is_some() {
            return Err(AuthError::Conflict("Email already exists".to_string()));
        }

        let pending = PendingRegistration {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let issued = self.tokens.issue_activation(pending)?;

        self.notifier
            .send(Email {
                to: email.to_string(),
                template: MailTemplate::Activation {
                    name: name.to_string(),
                    code: issued.code,
                },
            })
            .await?;

        tracing::info!(email = %email, "registration pending activation");

        Ok(IssuedRegistration {
            activation_token: issued.token,
        })
    }

    /// Complete a registration. The only path that materializes a user row.
    pub async fn activate(
        &self,
        activation_token: &str,
        submitted_code: &str,
    ) -> AuthResult<UserView> {
        let claims = self.tokens.verify_activation(activation_token)?;

        if claims.code != submitted_code {
            return Err(AuthError::CodeMismatch);
        }

        let PendingRegistration {
            name,
            email,
            password,
        } = claims.user;

        // The email may have been taken by a concurrent registration since
        // the token was issued.
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict("Email already exists".to_string()));
        }

        let password_hash = self.hasher.hash(&password)?;
        let user = self
            .store
            .create(NewUser {
                name,
                email,
                password_hash,
                role: DEFAULT_ROLE.to_string(),
            })
            .await?;

        tracing::info!(user_id = %user.id, "account activated");

        Ok(user.view())
    }
}
