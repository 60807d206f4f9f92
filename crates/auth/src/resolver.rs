//! Role-based permission resolution for session claims.
//!
//! Users own role *names*; roles own permissions. Both live in an external
//! store behind [`UserRoleStore`]. Resolution holds no state of its own and
//! never retries: a store failure is surfaced as
//! [`PermissionError::LookupFailed`].

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use keystone_core::UserId;

use crate::{ApiPermission, ClaimKind, Claims, Role, RoleName, ViewPermission};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("user '{0}' not found")]
    UserNotFound(UserId),

    #[error("role '{0}' not found")]
    RoleNotFound(RoleName),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// User and role lookups (external collaborator).
///
/// `acting` is the claims of whoever is asking; implementations apply the
/// same party scoping to user lookups as any other record read.
#[async_trait]
pub trait UserRoleStore: Send + Sync {
    async fn human_user_roles(&self, acting: &Claims, user_id: &UserId) -> Result<Vec<RoleName>, StoreError>;

    async fn api_user_roles(&self, acting: &Claims, user_id: &UserId) -> Result<Vec<RoleName>, StoreError>;

    async fn role(&self, name: &RoleName) -> Result<Role, StoreError>;
}

#[async_trait]
impl<S> UserRoleStore for Arc<S>
where
    S: UserRoleStore + ?Sized,
{
    async fn human_user_roles(&self, acting: &Claims, user_id: &UserId) -> Result<Vec<RoleName>, StoreError> {
        (**self).human_user_roles(acting, user_id).await
    }

    async fn api_user_roles(&self, acting: &Claims, user_id: &UserId) -> Result<Vec<RoleName>, StoreError> {
        (**self).api_user_roles(acting, user_id).await
    }

    async fn role(&self, name: &RoleName) -> Result<Role, StoreError> {
        (**self).role(name).await
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("invalid permission request: {0}")]
    InvalidRequest(String),

    #[error("claims of type '{0}' do not identify a user with roles")]
    UnsupportedClaims(ClaimKind),

    #[error("permission lookup failed: {0}")]
    LookupFailed(#[from] StoreError),
}

/// Answers "may this user do that?" for session claims.
#[async_trait]
pub trait PermissionResolver: Send + Sync {
    async fn user_has_permission(
        &self,
        acting: &Claims,
        user_id: &UserId,
        permission: &ApiPermission,
    ) -> Result<bool, PermissionError>;

    async fn all_api_permissions(
        &self,
        acting: &Claims,
        user_id: &UserId,
    ) -> Result<BTreeSet<ApiPermission>, PermissionError>;

    async fn all_view_permissions(
        &self,
        acting: &Claims,
        user_id: &UserId,
    ) -> Result<BTreeSet<ViewPermission>, PermissionError>;
}

#[async_trait]
impl<R> PermissionResolver for Arc<R>
where
    R: PermissionResolver + ?Sized,
{
    async fn user_has_permission(
        &self,
        acting: &Claims,
        user_id: &UserId,
        permission: &ApiPermission,
    ) -> Result<bool, PermissionError> {
        (**self).user_has_permission(acting, user_id, permission).await
    }

    async fn all_api_permissions(
        &self,
        acting: &Claims,
        user_id: &UserId,
    ) -> Result<BTreeSet<ApiPermission>, PermissionError> {
        (**self).all_api_permissions(acting, user_id).await
    }

    async fn all_view_permissions(
        &self,
        acting: &Claims,
        user_id: &UserId,
    ) -> Result<BTreeSet<ViewPermission>, PermissionError> {
        (**self).all_view_permissions(acting, user_id).await
    }
}

/// [`PermissionResolver`] backed by a [`UserRoleStore`].
#[derive(Debug, Clone)]
pub struct RolePermissionResolver<S> {
    store: S,
}

impl<S: UserRoleStore> RolePermissionResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Roles of `user_id`, looked up in the user table that matches the
    /// acting claims' kind.
    async fn roles(&self, acting: &Claims, user_id: &UserId) -> Result<Vec<Role>, PermissionError> {
        if user_id.is_blank() {
            return Err(PermissionError::InvalidRequest("user identifier is blank".to_string()));
        }

        let names = match acting.kind() {
            ClaimKind::HumanUserLogin => self.store.human_user_roles(acting, user_id).await?,
            ClaimKind::ApiUserLogin => self.store.api_user_roles(acting, user_id).await?,
            other => return Err(PermissionError::UnsupportedClaims(other)),
        };

        let mut roles = Vec::with_capacity(names.len());
        for name in &names {
            roles.push(self.store.role(name).await?);
        }
        Ok(roles)
    }
}

#[async_trait]
impl<S: UserRoleStore> PermissionResolver for RolePermissionResolver<S> {
    async fn user_has_permission(
        &self,
        acting: &Claims,
        user_id: &UserId,
        permission: &ApiPermission,
    ) -> Result<bool, PermissionError> {
        if permission.is_blank() {
            return Err(PermissionError::InvalidRequest("permission is blank".to_string()));
        }

        let granted = self
            .roles(acting, user_id)
            .await?
            .iter()
            .any(|role| role.api_permissions.contains(permission));
        Ok(granted)
    }

    async fn all_api_permissions(
        &self,
        acting: &Claims,
        user_id: &UserId,
    ) -> Result<BTreeSet<ApiPermission>, PermissionError> {
        Ok(self
            .roles(acting, user_id)
            .await?
            .into_iter()
            .flat_map(|role| role.api_permissions)
            .collect())
    }

    async fn all_view_permissions(
        &self,
        acting: &Claims,
        user_id: &UserId,
    ) -> Result<BTreeSet<ViewPermission>, PermissionError> {
        Ok(self
            .roles(acting, user_id)
            .await?
            .into_iter()
            .flat_map(|role| role.view_permissions)
            .collect())
    }
}
