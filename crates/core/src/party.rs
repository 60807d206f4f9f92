//! Parties: the tenants that own or are assigned records.

use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainResult, PartyId};

/// Kind of party.
///
/// `System` is the platform operator itself and is not subject to tenant
/// isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyType {
    System,
    Company,
    Client,
    Individual,
}

impl PartyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyType::System => "System",
            PartyType::Company => "Company",
            PartyType::Client => "Client",
            PartyType::Individual => "Individual",
        }
    }

    /// True for the sentinel party type that sees every tenant's data.
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, PartyType::System)
    }
}

impl core::str::FromStr for PartyType {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "System" => Ok(PartyType::System),
            "Company" => Ok(PartyType::Company),
            "Client" => Ok(PartyType::Client),
            "Individual" => Ok(PartyType::Individual),
            other => Err(DomainError::validation(format!("unknown party type '{other}'"))),
        }
    }
}

impl core::fmt::Display for PartyType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The party an actor is scoped to, plus the party above it (if any).
///
/// A company user is scoped to its company with the system as parent; a client
/// user is scoped to its client with the owning company as parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyScope {
    pub party_type: PartyType,
    pub party_id: PartyId,
    pub parent_party_type: Option<PartyType>,
    pub parent_id: Option<PartyId>,
}

impl PartyScope {
    pub fn new(party_type: PartyType, party_id: PartyId) -> Self {
        Self {
            party_type,
            party_id,
            parent_party_type: None,
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_party_type: PartyType, parent_id: PartyId) -> Self {
        self.parent_party_type = Some(parent_party_type);
        self.parent_id = Some(parent_id);
        self
    }

    pub fn is_unrestricted(&self) -> bool {
        self.party_type.is_unrestricted()
    }

    /// Whether an entity declared as belonging to `(party_type, party_id)` may
    /// be created by an actor with this scope.
    pub fn may_act_for(&self, party_type: PartyType, party_id: &PartyId) -> bool {
        self.is_unrestricted() || (self.party_type == party_type && &self.party_id == party_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_type_wire_names() {
        assert_eq!(serde_json::to_string(&PartyType::Company).unwrap(), "\"Company\"");
        let t: PartyType = serde_json::from_str("\"System\"").unwrap();
        assert!(t.is_unrestricted());
    }

    #[test]
    fn party_type_parses_its_display_form() {
        for t in [PartyType::System, PartyType::Company, PartyType::Client, PartyType::Individual] {
            assert_eq!(t.to_string().parse::<PartyType>().unwrap(), t);
        }
        assert!(matches!("company".parse::<PartyType>(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn only_system_is_unrestricted() {
        for t in [PartyType::Company, PartyType::Client, PartyType::Individual] {
            assert!(!t.is_unrestricted(), "{t} must be tenant-scoped");
        }
    }

    #[test]
    fn scoped_actor_acts_only_for_own_party() {
        let scope = PartyScope::new(PartyType::Company, PartyId::new("C1"))
            .with_parent(PartyType::System, PartyId::new("S"));

        assert!(scope.may_act_for(PartyType::Company, &PartyId::new("C1")));
        assert!(!scope.may_act_for(PartyType::Company, &PartyId::new("C2")));
        assert!(!scope.may_act_for(PartyType::Client, &PartyId::new("C1")));

        let system = PartyScope::new(PartyType::System, PartyId::new("S"));
        assert!(system.may_act_for(PartyType::Client, &PartyId::new("anything")));
    }
}
