//! The per-request decision: may this token invoke that operation?

use std::sync::Arc;

use thiserror::Error;

use keystone_core::{Clock, SystemClock};

use crate::permissions::operations;
use crate::resolver::{PermissionError, PermissionResolver};
use crate::token::{TokenError, TokenValidator};
use crate::wrapped::{self, UnwrapError};
use crate::{ApiPermission, ClaimKind, Claims};

/// Why a request was refused.
///
/// Every variant is terminal for the request. Transport layers should map all
/// of them to the same "unauthorized" response; [`AuthError::kind`] is for
/// logs and metrics, not for the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Unwrap(#[from] UnwrapError),

    #[error("not authorised for '{0}'")]
    NotAuthorised(ApiPermission),

    #[error(transparent)]
    Permission(#[from] PermissionError),
}

/// Failure taxonomy of the authorization core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    SignatureInvalid,
    TokenMalformed,
    EnvelopeTypeUnknown,
    EnvelopePayloadCorrupt,
    ClaimExpired,
    NotAuthorised,
    PermissionLookupFailed,
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::Token(TokenError::SignatureInvalid | TokenError::Key(_)) => {
                AuthErrorKind::SignatureInvalid
            }
            AuthError::Token(
                TokenError::Malformed(_) | TokenError::Wrap(_) | TokenError::Signing(_),
            ) => AuthErrorKind::TokenMalformed,
            AuthError::Unwrap(UnwrapError::InvalidType(_)) => AuthErrorKind::EnvelopeTypeUnknown,
            AuthError::Unwrap(UnwrapError::Unmarshalling(_)) => AuthErrorKind::EnvelopePayloadCorrupt,
            AuthError::Unwrap(UnwrapError::Expired) => AuthErrorKind::ClaimExpired,
            AuthError::NotAuthorised(_) => AuthErrorKind::NotAuthorised,
            AuthError::Permission(_) => AuthErrorKind::PermissionLookupFailed,
        }
    }
}

const REGISTER_COMPANY_ADMIN_USER_GRANTS: &[&str] = &[
    operations::HUMAN_USER_VALIDATE,
    operations::REGISTER_COMPANY_ADMIN_USER,
];
const REGISTER_COMPANY_USER_GRANTS: &[&str] = &[
    operations::HUMAN_USER_VALIDATE,
    operations::REGISTER_COMPANY_USER,
];
const REGISTER_CLIENT_ADMIN_USER_GRANTS: &[&str] = &[
    operations::HUMAN_USER_VALIDATE,
    operations::REGISTER_CLIENT_ADMIN_USER,
];
const REGISTER_CLIENT_USER_GRANTS: &[&str] = &[
    operations::HUMAN_USER_VALIDATE,
    operations::REGISTER_CLIENT_USER,
];
const RESET_PASSWORD_GRANTS: &[&str] = &[operations::HUMAN_USER_SET_PASSWORD];

/// Operations a grant claim may invoke. Empty for session kinds, whose
/// authority comes from the permission resolver instead.
pub fn granted_operations(kind: ClaimKind) -> &'static [&'static str] {
    match kind {
        ClaimKind::HumanUserLogin | ClaimKind::ApiUserLogin => &[],
        ClaimKind::RegisterCompanyAdminUser => REGISTER_COMPANY_ADMIN_USER_GRANTS,
        ClaimKind::RegisterCompanyUser => REGISTER_COMPANY_USER_GRANTS,
        ClaimKind::RegisterClientAdminUser => REGISTER_CLIENT_ADMIN_USER_GRANTS,
        ClaimKind::RegisterClientUser => REGISTER_CLIENT_USER_GRANTS,
        ClaimKind::ResetPassword => RESET_PASSWORD_GRANTS,
    }
}

/// The decision point for every inbound request.
///
/// Stateless apart from its collaborators: each call re-validates and
/// re-decodes the token; nothing is cached between requests.
#[derive(Clone)]
pub struct Authorizer {
    validator: TokenValidator,
    resolver: Arc<dyn PermissionResolver>,
    clock: Arc<dyn Clock>,
}

impl Authorizer {
    pub fn new(validator: TokenValidator, resolver: Arc<dyn PermissionResolver>) -> Self {
        Self {
            validator,
            resolver,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Authorize `token` to invoke `operation`, returning its decoded claims.
    ///
    /// - Session claims are allowed iff the resolver grants the operation to
    ///   the session's user.
    /// - Grant claims are allowed iff the operation is in their allow-list.
    #[tracing::instrument(name = "authorize", skip_all, fields(operation = %operation))]
    pub async fn authorize(&self, token: &str, operation: &str) -> Result<Claims, AuthError> {
        match self.decide(token, operation).await {
            Ok(claims) => {
                tracing::debug!(claims_kind = %claims.kind(), "request authorised");
                Ok(claims)
            }
            Err(err) => {
                tracing::warn!(kind = ?err.kind(), error = %err, "request refused");
                Err(err)
            }
        }
    }

    async fn decide(&self, token: &str, operation: &str) -> Result<Claims, AuthError> {
        let envelope = self.validator.validate(token)?;
        let claims = wrapped::unwrap_at(&envelope, self.clock.now())?;

        let permission = ApiPermission::new(operation.to_string());
        if permission.is_blank() {
            return Err(AuthError::NotAuthorised(permission));
        }

        let allowed = match &claims {
            Claims::HumanUserLogin(session) | Claims::ApiUserLogin(session) => {
                self.resolver
                    .user_has_permission(&claims, &session.user_id, &permission)
                    .await?
            }
            Claims::RegisterCompanyAdminUser(_)
            | Claims::RegisterCompanyUser(_)
            | Claims::RegisterClientAdminUser(_)
            | Claims::RegisterClientUser(_)
            | Claims::ResetPassword(_) => granted_operations(claims.kind())
                .iter()
                .any(|granted| *granted == operation),
        };

        if !allowed {
            return Err(AuthError::NotAuthorised(permission));
        }
        Ok(claims)
    }
}

impl core::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Authorizer")
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}
