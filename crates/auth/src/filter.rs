//! Tenant isolation at query time.
//!
//! Every multi-tenant record handler passes its query filter through
//! [`contextualize`] before reading. A scoped actor only sees records its
//! party owns or has been assigned; the system party sees everything.

use serde_json::{Map, Value as JsonValue};

use keystone_core::PartyId;

use crate::Claims;

pub const OWNER_PARTY_ID_FIELD: &str = "ownerPartyId";
pub const ASSIGNED_PARTY_ID_FIELD: &str = "assignedPartyId";

/// Restrict `filter` to records visible to `claims`.
///
/// Returns `filter` unchanged for system-scoped claims, otherwise
/// `{"$and": [filter, {"$or": [{"ownerPartyId": id}, {"assignedPartyId": id}]}]}`.
pub fn contextualize(filter: JsonValue, claims: &Claims) -> JsonValue {
    let scope = claims.party_scope();
    if scope.is_unrestricted() {
        return filter;
    }

    let party_id = JsonValue::String(scope.party_id.as_str().to_string());
    let either = JsonValue::Array(vec![
        single(OWNER_PARTY_ID_FIELD, party_id.clone()),
        single(ASSIGNED_PARTY_ID_FIELD, party_id),
    ]);

    single("$and", JsonValue::Array(vec![filter, single("$or", either)]))
}

/// In-memory evaluation of the party predicate [`contextualize`] adds.
pub fn is_visible(claims: &Claims, owner: &PartyId, assigned: Option<&PartyId>) -> bool {
    let scope = claims.party_scope();
    scope.is_unrestricted() || &scope.party_id == owner || assigned == Some(&scope.party_id)
}

fn single(key: &str, value: JsonValue) -> JsonValue {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    JsonValue::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use keystone_core::{PartyScope, PartyType, UserId};
    use serde_json::json;

    use crate::SessionLogin;

    fn claims(party_type: PartyType, party_id: &str) -> Claims {
        Claims::HumanUserLogin(SessionLogin::issue(
            UserId::new("U1"),
            PartyScope::new(party_type, PartyId::new(party_id)),
            Utc::now(),
            Duration::minutes(90),
        ))
    }

    #[test]
    fn system_claims_leave_filter_unchanged() {
        let filtered = contextualize(json!({}), &claims(PartyType::System, "SYS"));
        assert_eq!(filtered, json!({}));

        let base = json!({"name": "sunShop"});
        assert_eq!(contextualize(base.clone(), &claims(PartyType::System, "SYS")), base);
    }

    #[test]
    fn company_claims_restrict_to_owned_or_assigned() {
        let filtered = contextualize(json!({}), &claims(PartyType::Company, "C1"));
        assert_eq!(
            filtered,
            json!({"$and": [{}, {"$or": [{"ownerPartyId": "C1"}, {"assignedPartyId": "C1"}]}]})
        );
        assert_eq!(
            serde_json::to_string(&filtered).unwrap(),
            r#"{"$and":[{},{"$or":[{"ownerPartyId":"C1"},{"assignedPartyId":"C1"}]}]}"#
        );
    }

    #[test]
    fn base_filter_is_preserved_inside_conjunction() {
        let base = json!({"id": "D7"});
        let filtered = contextualize(base.clone(), &claims(PartyType::Client, "CL3"));
        assert_eq!(filtered["$and"][0], base);
        assert_eq!(filtered["$and"][1]["$or"][1]["assignedPartyId"], "CL3");
    }

    #[test]
    fn visibility_matches_filter_semantics() {
        let c1 = claims(PartyType::Company, "C1");
        let owner = PartyId::new("C1");
        let other = PartyId::new("C2");

        assert!(is_visible(&c1, &owner, None));
        assert!(is_visible(&c1, &other, Some(&owner)));
        assert!(!is_visible(&c1, &other, None));
        assert!(!is_visible(&c1, &other, Some(&other)));
        assert!(is_visible(&claims(PartyType::System, "SYS"), &other, None));
    }
}
