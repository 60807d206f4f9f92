//! The human user record embedded in registration grants.
//!
//! Registration tokens carry the invited user's record so the registration
//! call can complete it without a lookup. That couples the token payload to
//! this record's shape: any field added here changes what old tokens decode
//! to, so fields must stay optional-compatible.

use serde::{Deserialize, Serialize};

use keystone_core::{PartyId, PartyScope, PartyType, UserId};

use crate::RoleName;

/// A human user as invited by a registration flow.
///
/// The password hash is owned by the user store and is never part of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanUser {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub username: String,
    pub email_address: String,
    #[serde(default)]
    pub roles: Vec<RoleName>,
    pub parent_party_type: Option<PartyType>,
    pub parent_id: Option<PartyId>,
    pub party_type: PartyType,
    pub party_id: PartyId,
    #[serde(default)]
    pub registered: bool,
}

impl HumanUser {
    /// A not-yet-registered user invited into `scope`.
    pub fn invited(id: UserId, email_address: impl Into<String>, scope: &PartyScope) -> Self {
        Self {
            id,
            name: String::new(),
            surname: String::new(),
            username: String::new(),
            email_address: email_address.into(),
            roles: Vec::new(),
            parent_party_type: scope.parent_party_type,
            parent_id: scope.parent_id.clone(),
            party_type: scope.party_type,
            party_id: scope.party_id.clone(),
            registered: false,
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
