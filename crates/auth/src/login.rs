//! Credential login: exchange a username (or email address) and password for
//! a signed session token.
//!
//! User records are read under the service's own system claims, since the
//! caller has no claims yet. Every refusal is reported as the same
//! [`LoginError`]; the actual cause is only logged.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use keystone_core::{Clock, PartyScope, SystemClock, UserId};

use crate::resolver::StoreError;
use crate::token::TokenError;
use crate::{AuthConfig, Claims, TokenIssuer};

/// Which user table a login reads, and which session claims it mints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserKind {
    Human,
    Api,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdentifier {
    Username(String),
    EmailAddress(String),
}

/// What a successful credential lookup yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub user_id: UserId,
    pub scope: PartyScope,
    pub password_hash: String,
}

/// Credential lookups (external collaborator).
///
/// `Ok(None)` means no user visible to `acting` matches `identifier`.
#[async_trait]
pub trait UserCredentialStore: Send + Sync {
    async fn credentials(
        &self,
        acting: &Claims,
        kind: UserKind,
        identifier: &UserIdentifier,
    ) -> Result<Option<StoredCredentials>, StoreError>;
}

#[async_trait]
impl<S> UserCredentialStore for Arc<S>
where
    S: UserCredentialStore + ?Sized,
{
    async fn credentials(
        &self,
        acting: &Claims,
        kind: UserKind,
        identifier: &UserIdentifier,
    ) -> Result<Option<StoredCredentials>, StoreError> {
        (**self).credentials(acting, kind, identifier).await
    }
}

/// Compares a presented password with a stored hash. Hashing itself lives
/// outside this crate.
pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, password: &str, password_hash: &str) -> bool;
}

impl<V> PasswordVerifier for Arc<V>
where
    V: PasswordVerifier + ?Sized,
{
    fn verify(&self, password: &str, password_hash: &str) -> bool {
        (**self).verify(password, password_hash)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("log in failed")]
pub struct LoginError;

#[derive(Debug, Error)]
enum Refusal {
    #[error("no user matches the username or email address")]
    UnknownUser,

    #[error("password mismatch")]
    WrongPassword,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

pub struct LoginService {
    kind: UserKind,
    credentials: Arc<dyn UserCredentialStore>,
    passwords: Arc<dyn PasswordVerifier>,
    issuer: TokenIssuer,
    system_claims: Claims,
    config: AuthConfig,
    clock: Arc<dyn Clock>,
}

impl LoginService {
    pub fn new(
        kind: UserKind,
        credentials: Arc<dyn UserCredentialStore>,
        passwords: Arc<dyn PasswordVerifier>,
        issuer: TokenIssuer,
        system_claims: Claims,
    ) -> Self {
        Self {
            kind,
            credentials,
            passwords,
            issuer,
            system_claims,
            config: AuthConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_config(mut self, config: AuthConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Check the password of the user found by username, falling back to
    /// email address, and return a session token for them.
    #[tracing::instrument(name = "login", skip_all, fields(user_kind = ?self.kind))]
    pub async fn login(&self, username_or_email: &str, password: &str) -> Result<String, LoginError> {
        match self.attempt(username_or_email, password).await {
            Ok(token) => {
                tracing::debug!("login succeeded");
                Ok(token)
            }
            Err(refusal) => {
                tracing::warn!(reason = %refusal, "login refused");
                Err(LoginError)
            }
        }
    }

    async fn attempt(&self, username_or_email: &str, password: &str) -> Result<String, Refusal> {
        let presented = username_or_email.trim();
        if presented.is_empty() {
            return Err(Refusal::UnknownUser);
        }

        let found = match self.find(UserIdentifier::Username(presented.to_string())).await? {
            Some(found) => found,
            None => self
                .find(UserIdentifier::EmailAddress(presented.to_string()))
                .await?
                .ok_or(Refusal::UnknownUser)?,
        };

        if !self.passwords.verify(password, &found.password_hash) {
            return Err(Refusal::WrongPassword);
        }

        let now = self.clock.now();
        let claims = match self.kind {
            UserKind::Human => self.config.human_login(found.user_id, found.scope, now),
            UserKind::Api => self.config.api_login(found.user_id, found.scope, now),
        };
        Ok(self.issuer.issue(&claims)?)
    }

    async fn find(&self, identifier: UserIdentifier) -> Result<Option<StoredCredentials>, StoreError> {
        self.credentials
            .credentials(&self.system_claims, self.kind, &identifier)
            .await
    }
}

impl core::fmt::Debug for LoginService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginService")
            .field("kind", &self.kind)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
