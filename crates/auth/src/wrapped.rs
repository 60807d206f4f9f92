//! Tagged envelope for claims on the wire.
//!
//! A token's payload is exactly `{"type": "<kind>", "value": {...}}`. The tag
//! is kept as a plain string until [`unwrap`], so an unknown tag is reported
//! as [`UnwrapError::InvalidType`] rather than as a generic parse failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::{
    ClaimKind, Claims, RegistrationGrant, ResetPasswordGrant, SessionLogin,
};

/// A claim in its serialized, not-yet-trusted form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wrapped {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: JsonValue,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WrapError {
    #[error("marshalling claims: {0}")]
    Marshalling(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnwrapError {
    #[error("invalid claims type '{0}'")]
    InvalidType(String),

    #[error("unmarshalling claims: {0}")]
    Unmarshalling(String),

    #[error("claims have expired")]
    Expired,
}

/// Serialize `claims` into its envelope.
pub fn wrap(claims: &Claims) -> Result<Wrapped, WrapError> {
    let value = encode(claims).map_err(|e| WrapError::Marshalling(e.to_string()))?;
    Ok(Wrapped {
        kind: claims.kind().as_str().to_string(),
        value,
    })
}

/// Decode an envelope against the wall clock.
pub fn unwrap(wrapped: &Wrapped) -> Result<Claims, UnwrapError> {
    unwrap_at(wrapped, Utc::now())
}

/// Decode an envelope and reject it if it has expired at `now`.
///
/// The expiry check runs after a successful decode and before the claims are
/// returned; callers never see expired claims.
pub fn unwrap_at(wrapped: &Wrapped, now: DateTime<Utc>) -> Result<Claims, UnwrapError> {
    let kind = ClaimKind::from_tag(&wrapped.kind)
        .ok_or_else(|| UnwrapError::InvalidType(wrapped.kind.clone()))?;

    let claims = decode(kind, &wrapped.value)
        .map_err(|e| UnwrapError::Unmarshalling(e.to_string()))?;

    if claims.expired_at(now) {
        return Err(UnwrapError::Expired);
    }

    Ok(claims)
}

impl Wrapped {
    pub fn unwrap_at(&self, now: DateTime<Utc>) -> Result<Claims, UnwrapError> {
        unwrap_at(self, now)
    }
}

fn encode(claims: &Claims) -> Result<JsonValue, serde_json::Error> {
    match claims {
        Claims::HumanUserLogin(c) | Claims::ApiUserLogin(c) => serde_json::to_value(c),
        Claims::RegisterCompanyAdminUser(c)
        | Claims::RegisterCompanyUser(c)
        | Claims::RegisterClientAdminUser(c)
        | Claims::RegisterClientUser(c) => serde_json::to_value(c),
        Claims::ResetPassword(c) => serde_json::to_value(c),
    }
}

fn decode(kind: ClaimKind, value: &JsonValue) -> Result<Claims, serde_json::Error> {
    Ok(match kind {
        ClaimKind::HumanUserLogin => Claims::HumanUserLogin(SessionLogin::deserialize(value)?),
        ClaimKind::ApiUserLogin => Claims::ApiUserLogin(SessionLogin::deserialize(value)?),
        ClaimKind::RegisterCompanyAdminUser => {
            Claims::RegisterCompanyAdminUser(RegistrationGrant::deserialize(value)?)
        }
        ClaimKind::RegisterCompanyUser => {
            Claims::RegisterCompanyUser(RegistrationGrant::deserialize(value)?)
        }
        ClaimKind::RegisterClientAdminUser => {
            Claims::RegisterClientAdminUser(RegistrationGrant::deserialize(value)?)
        }
        ClaimKind::RegisterClientUser => {
            Claims::RegisterClientUser(RegistrationGrant::deserialize(value)?)
        }
        ClaimKind::ResetPassword => Claims::ResetPassword(ResetPasswordGrant::deserialize(value)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use keystone_core::{PartyId, PartyScope, PartyType, UserId};
    use proptest::prelude::*;
    use serde_json::json;

    use crate::HumanUser;

    fn scope() -> PartyScope {
        PartyScope::new(PartyType::Client, PartyId::new("CL1"))
            .with_parent(PartyType::Company, PartyId::new("C1"))
    }

    fn every_variant(now: DateTime<Utc>, lifetime: Duration) -> Vec<Claims> {
        let mut user = HumanUser::invited(UserId::new("U7"), "u7@example.com", &scope());
        user.name = "Tom".to_string();
        user.roles = vec![crate::RoleName::new("clientUser")];
        let grant = RegistrationGrant::issue(user, now, lifetime);
        let login = SessionLogin::issue(UserId::new("U1"), scope(), now, lifetime);
        let reset = ResetPasswordGrant::issue(UserId::new("U1"), scope(), now, lifetime);

        vec![
            Claims::HumanUserLogin(login.clone()),
            Claims::ApiUserLogin(login),
            Claims::RegisterCompanyAdminUser(grant.clone()),
            Claims::RegisterCompanyUser(grant.clone()),
            Claims::RegisterClientAdminUser(grant.clone()),
            Claims::RegisterClientUser(grant),
            Claims::ResetPassword(reset),
        ]
    }

    #[test]
    fn unwrap_reverses_wrap_for_every_variant() {
        let now = Utc::now();
        for claims in every_variant(now, Duration::minutes(30)) {
            let wrapped = wrap(&claims).unwrap();
            assert_eq!(wrapped.kind, claims.kind().as_str());
            assert_eq!(unwrap_at(&wrapped, now).unwrap(), claims);
        }
    }

    #[test]
    fn embedded_user_survives_round_trip() {
        let now = Utc::now();
        let claims = every_variant(now, Duration::minutes(30)).remove(2);
        let back = unwrap_at(&wrap(&claims).unwrap(), now).unwrap();

        let Claims::RegisterCompanyAdminUser(grant) = back else {
            panic!("expected RegisterCompanyAdminUser claims");
        };
        assert_eq!(grant.user.name, "Tom");
        assert_eq!(grant.user.email_address, "u7@example.com");
        assert_eq!(grant.user.roles, vec![crate::RoleName::new("clientUser")]);
    }

    #[test]
    fn expired_claims_never_unwrap() {
        let issued = Utc::now() - Duration::hours(2);
        for claims in every_variant(issued, Duration::minutes(90)) {
            let wrapped = wrap(&claims).unwrap();
            assert_eq!(unwrap_at(&wrapped, Utc::now()), Err(UnwrapError::Expired));
            assert_eq!(unwrap(&wrapped), Err(UnwrapError::Expired));
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let wrapped = Wrapped {
            kind: "Login".to_string(),
            value: json!({}),
        };
        assert_eq!(
            unwrap(&wrapped),
            Err(UnwrapError::InvalidType("Login".to_string()))
        );
    }

    #[test]
    fn payload_must_match_declared_type() {
        let now = Utc::now();
        let reset = ResetPasswordGrant::issue(UserId::new("U1"), scope(), now, Duration::minutes(5));
        let mut wrapped = wrap(&Claims::ResetPassword(reset)).unwrap();
        wrapped.kind = "RegisterClientUser".to_string();

        assert!(matches!(
            unwrap_at(&wrapped, now),
            Err(UnwrapError::Unmarshalling(_))
        ));
    }

    #[test]
    fn envelope_json_shape() {
        let now = Utc::now();
        let login = SessionLogin::issue(UserId::new("U1"), scope(), now, Duration::minutes(5));
        let wrapped = wrap(&Claims::ApiUserLogin(login)).unwrap();
        let json = serde_json::to_value(&wrapped).unwrap();

        assert_eq!(json["type"], "APIUserLogin");
        assert_eq!(json["value"]["userId"], "U1");
        assert_eq!(json["value"]["partyId"], "CL1");
    }

    proptest! {
        /// Property: a claim unwraps to itself until its expiration second
        /// has passed, and to `Expired` from then on.
        #[test]
        fn expiry_dominates_round_trip(
            lifetime_secs in 0i64..(30 * 24 * 3600),
            elapsed_secs in 0i64..(31 * 24 * 3600),
            variant in 0usize..7,
        ) {
            let issued = Utc::now();
            let claims = every_variant(issued, Duration::seconds(lifetime_secs)).swap_remove(variant);
            let wrapped = wrap(&claims).unwrap();
            let now = issued + Duration::seconds(elapsed_secs);

            if elapsed_secs > lifetime_secs {
                prop_assert_eq!(unwrap_at(&wrapped, now), Err(UnwrapError::Expired));
            } else {
                prop_assert_eq!(unwrap_at(&wrapped, now), Ok(claims));
            }
        }
    }
}
