use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::{ApiPermission, ViewPermission};

/// Role identifier used for RBAC.
///
/// Users reference roles by name; the permission set behind a name lives in
/// the role store and is looked up on every resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(Cow<'static, str>);

impl RoleName {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named bundle of API and view permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: RoleName,
    #[serde(default)]
    pub api_permissions: Vec<ApiPermission>,
    #[serde(default)]
    pub view_permissions: Vec<ViewPermission>,
}

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: RoleName::new(name),
            api_permissions: Vec::new(),
            view_permissions: Vec::new(),
        }
    }

    pub fn with_api_permission(mut self, permission: impl Into<Cow<'static, str>>) -> Self {
        self.api_permissions.push(ApiPermission::new(permission));
        self
    }

    pub fn with_view_permission(mut self, permission: impl Into<Cow<'static, str>>) -> Self {
        self.view_permissions.push(ViewPermission::new(permission));
        self
    }
}
