use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// API permission identifier.
///
/// API permissions share one flat namespace with JSON-RPC method names
/// (e.g. `"CompanyRecordHandler.Retrieve"`): the operation a request invokes
/// *is* the permission it needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiPermission(Cow<'static, str>);

impl ApiPermission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl core::fmt::Display for ApiPermission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// UI-visibility permission identifier (which screens/widgets a user sees).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewPermission(Cow<'static, str>);

impl ViewPermission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ViewPermission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operation identifiers that grant claims are allowed to invoke.
pub mod operations {
    pub const HUMAN_USER_VALIDATE: &str = "HumanUser-Validator.Validate";
    pub const HUMAN_USER_SET_PASSWORD: &str = "HumanUser-Administrator.SetPassword";
    pub const REGISTER_COMPANY_ADMIN_USER: &str = "PartyRegistrar.RegisterCompanyAdminUser";
    pub const REGISTER_COMPANY_USER: &str = "PartyRegistrar.RegisterCompanyUser";
    pub const REGISTER_CLIENT_ADMIN_USER: &str = "PartyRegistrar.RegisterClientAdminUser";
    pub const REGISTER_CLIENT_USER: &str = "PartyRegistrar.RegisterClientUser";
}
