//! Claims carried inside signed tokens.
//!
//! [`Claims`] is a closed set. Every variant answers the same three questions:
//! what kind it is, whether it has expired, and which party it is scoped to.
//! Adding a variant means adding a [`ClaimKind`], a match arm in
//! `wrapped::decode`/`wrapped::encode`, and an entry in the grant allow-lists;
//! the compiler points at each of them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use keystone_core::{PartyId, PartyScope, PartyType, UserId};

use crate::HumanUser;

/// Wire tag identifying a claim variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimKind {
    HumanUserLogin,
    #[serde(rename = "APIUserLogin")]
    ApiUserLogin,
    RegisterCompanyAdminUser,
    RegisterCompanyUser,
    RegisterClientAdminUser,
    RegisterClientUser,
    ResetPassword,
}

impl ClaimKind {
    pub const ALL: [ClaimKind; 7] = [
        ClaimKind::HumanUserLogin,
        ClaimKind::ApiUserLogin,
        ClaimKind::RegisterCompanyAdminUser,
        ClaimKind::RegisterCompanyUser,
        ClaimKind::RegisterClientAdminUser,
        ClaimKind::RegisterClientUser,
        ClaimKind::ResetPassword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimKind::HumanUserLogin => "HumanUserLogin",
            ClaimKind::ApiUserLogin => "APIUserLogin",
            ClaimKind::RegisterCompanyAdminUser => "RegisterCompanyAdminUser",
            ClaimKind::RegisterCompanyUser => "RegisterCompanyUser",
            ClaimKind::RegisterClientAdminUser => "RegisterClientAdminUser",
            ClaimKind::RegisterClientUser => "RegisterClientUser",
            ClaimKind::ResetPassword => "ResetPassword",
        }
    }

    /// Look up a kind by its wire tag. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Session kinds are authorized through the permission resolver; every
    /// other kind is a grant with a fixed allow-list.
    pub fn is_session(&self) -> bool {
        matches!(self, ClaimKind::HumanUserLogin | ClaimKind::ApiUserLogin)
    }
}

impl core::fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The issue/expiry window shared by every claim variant.
///
/// Times are Unix seconds, matching the token payload.
pub trait ClaimWindow {
    fn issue_time(&self) -> i64;
    fn expiration_time(&self) -> i64;

    /// A claim is expired once `now` is strictly past its expiration second.
    fn expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.expiration_time()
    }

    /// Time left before expiry; negative once expired.
    fn time_to_expiry(&self, now: DateTime<Utc>) -> Duration {
        let secs = self.expiration_time().saturating_sub(now.timestamp());
        Duration::try_seconds(secs).unwrap_or(if secs > 0 {
            Duration::MAX
        } else {
            Duration::MIN
        })
    }
}

fn stamp(now: DateTime<Utc>, lifetime: Duration) -> (i64, i64) {
    let issue_time = now.timestamp();
    let expiration_time = now
        .checked_add_signed(lifetime)
        .map(|t| t.timestamp())
        .unwrap_or(issue_time);
    (issue_time, expiration_time)
}

/// A logged-in session, human or API user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLogin {
    pub user_id: UserId,
    pub issue_time: i64,
    pub expiration_time: i64,
    pub parent_party_type: Option<PartyType>,
    pub parent_id: Option<PartyId>,
    pub party_type: PartyType,
    pub party_id: PartyId,
}

impl SessionLogin {
    pub fn issue(user_id: UserId, scope: PartyScope, now: DateTime<Utc>, lifetime: Duration) -> Self {
        let (issue_time, expiration_time) = stamp(now, lifetime);
        Self {
            user_id,
            issue_time,
            expiration_time,
            parent_party_type: scope.parent_party_type,
            parent_id: scope.parent_id,
            party_type: scope.party_type,
            party_id: scope.party_id,
        }
    }

    pub fn party_scope(&self) -> PartyScope {
        PartyScope {
            party_type: self.party_type,
            party_id: self.party_id.clone(),
            parent_party_type: self.parent_party_type,
            parent_id: self.parent_id.clone(),
        }
    }
}

impl ClaimWindow for SessionLogin {
    fn issue_time(&self) -> i64 {
        self.issue_time
    }

    fn expiration_time(&self) -> i64 {
        self.expiration_time
    }
}

/// A single-use invitation to register the embedded user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationGrant {
    pub issue_time: i64,
    pub expiration_time: i64,
    pub user: HumanUser,
    pub parent_party_type: Option<PartyType>,
    pub parent_id: Option<PartyId>,
    pub party_type: PartyType,
    pub party_id: PartyId,
}

impl RegistrationGrant {
    /// Invite `user` into the party it declares.
    pub fn issue(user: HumanUser, now: DateTime<Utc>, lifetime: Duration) -> Self {
        let (issue_time, expiration_time) = stamp(now, lifetime);
        let scope = user.party_scope();
        Self {
            issue_time,
            expiration_time,
            user,
            parent_party_type: scope.parent_party_type,
            parent_id: scope.parent_id,
            party_type: scope.party_type,
            party_id: scope.party_id,
        }
    }

    pub fn party_scope(&self) -> PartyScope {
        PartyScope {
            party_type: self.party_type,
            party_id: self.party_id.clone(),
            parent_party_type: self.parent_party_type,
            parent_id: self.parent_id.clone(),
        }
    }
}

impl ClaimWindow for RegistrationGrant {
    fn issue_time(&self) -> i64 {
        self.issue_time
    }

    fn expiration_time(&self) -> i64 {
        self.expiration_time
    }
}

/// A single-use capability to set one account's password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordGrant {
    pub user_id: UserId,
    pub issue_time: i64,
    pub expiration_time: i64,
    pub parent_party_type: Option<PartyType>,
    pub parent_id: Option<PartyId>,
    pub party_type: PartyType,
    pub party_id: PartyId,
}

impl ResetPasswordGrant {
    pub fn issue(user_id: UserId, scope: PartyScope, now: DateTime<Utc>, lifetime: Duration) -> Self {
        let (issue_time, expiration_time) = stamp(now, lifetime);
        Self {
            user_id,
            issue_time,
            expiration_time,
            parent_party_type: scope.parent_party_type,
            parent_id: scope.parent_id,
            party_type: scope.party_type,
            party_id: scope.party_id,
        }
    }

    pub fn party_scope(&self) -> PartyScope {
        PartyScope {
            party_type: self.party_type,
            party_id: self.party_id.clone(),
            parent_party_type: self.parent_party_type,
            parent_id: self.parent_id.clone(),
        }
    }
}

impl ClaimWindow for ResetPasswordGrant {
    fn issue_time(&self) -> i64 {
        self.issue_time
    }

    fn expiration_time(&self) -> i64 {
        self.expiration_time
    }
}

/// A decoded, typed claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claims {
    HumanUserLogin(SessionLogin),
    ApiUserLogin(SessionLogin),
    RegisterCompanyAdminUser(RegistrationGrant),
    RegisterCompanyUser(RegistrationGrant),
    RegisterClientAdminUser(RegistrationGrant),
    RegisterClientUser(RegistrationGrant),
    ResetPassword(ResetPasswordGrant),
}

impl Claims {
    /// Claims for the platform's own internal actor.
    ///
    /// Scoped to the `System` party, so contextual filters pass through
    /// unchanged. Build once at startup and hand to the collaborators that
    /// need to look across tenants (e.g. uniqueness checks).
    pub fn system(user_id: UserId, party_id: PartyId, now: DateTime<Utc>, lifetime: Duration) -> Self {
        Claims::HumanUserLogin(SessionLogin::issue(
            user_id,
            PartyScope::new(PartyType::System, party_id),
            now,
            lifetime,
        ))
    }

    pub fn kind(&self) -> ClaimKind {
        match self {
            Claims::HumanUserLogin(_) => ClaimKind::HumanUserLogin,
            Claims::ApiUserLogin(_) => ClaimKind::ApiUserLogin,
            Claims::RegisterCompanyAdminUser(_) => ClaimKind::RegisterCompanyAdminUser,
            Claims::RegisterCompanyUser(_) => ClaimKind::RegisterCompanyUser,
            Claims::RegisterClientAdminUser(_) => ClaimKind::RegisterClientAdminUser,
            Claims::RegisterClientUser(_) => ClaimKind::RegisterClientUser,
            Claims::ResetPassword(_) => ClaimKind::ResetPassword,
        }
    }

    fn window(&self) -> &dyn ClaimWindow {
        match self {
            Claims::HumanUserLogin(c) | Claims::ApiUserLogin(c) => c,
            Claims::RegisterCompanyAdminUser(c)
            | Claims::RegisterCompanyUser(c)
            | Claims::RegisterClientAdminUser(c)
            | Claims::RegisterClientUser(c) => c,
            Claims::ResetPassword(c) => c,
        }
    }

    pub fn issue_time(&self) -> i64 {
        self.window().issue_time()
    }

    pub fn expiration_time(&self) -> i64 {
        self.window().expiration_time()
    }

    /// Wall-clock expiry check.
    pub fn expired(&self) -> bool {
        self.expired_at(Utc::now())
    }

    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        self.window().expired_at(now)
    }

    pub fn time_to_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.window().time_to_expiry(now)
    }

    pub fn party_scope(&self) -> PartyScope {
        match self {
            Claims::HumanUserLogin(c) | Claims::ApiUserLogin(c) => c.party_scope(),
            Claims::RegisterCompanyAdminUser(c)
            | Claims::RegisterCompanyUser(c)
            | Claims::RegisterClientAdminUser(c)
            | Claims::RegisterClientUser(c) => c.party_scope(),
            Claims::ResetPassword(c) => c.party_scope(),
        }
    }

    /// The user this claim speaks for, if it names one directly.
    pub fn subject(&self) -> Option<&UserId> {
        match self {
            Claims::HumanUserLogin(c) | Claims::ApiUserLogin(c) => Some(&c.user_id),
            Claims::ResetPassword(c) => Some(&c.user_id),
            Claims::RegisterCompanyAdminUser(_)
            | Claims::RegisterCompanyUser(_)
            | Claims::RegisterClientAdminUser(_)
            | Claims::RegisterClientUser(_) => None,
        }
    }
}
