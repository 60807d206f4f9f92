//! In-memory [`UserRoleStore`] for tests/dev.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use keystone_core::{PartyScope, UserId};

use crate::filter::is_visible;
use crate::login::{StoredCredentials, UserCredentialStore, UserIdentifier, UserKind};
use crate::resolver::{StoreError, UserRoleStore};
use crate::{Claims, Role, RoleName};

#[derive(Debug, Clone)]
struct UserEntry {
    scope: PartyScope,
    roles: Vec<RoleName>,
    login: Option<LoginEntry>,
}

#[derive(Debug, Clone)]
struct LoginEntry {
    username: String,
    email_address: String,
    password_hash: String,
}

impl LoginEntry {
    fn matches(&self, identifier: &UserIdentifier) -> bool {
        match identifier {
            UserIdentifier::Username(username) => &self.username == username,
            UserIdentifier::EmailAddress(email) => self.email_address.eq_ignore_ascii_case(email),
        }
    }
}

type UserTable = RwLock<HashMap<UserId, UserEntry>>;

// A panic while a lock was held leaves plain map data behind, so every
// access recovers the guard instead of failing.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Tenant-aware user/role tables held in memory.
///
/// User lookups apply the acting claims' party scope the same way a storage
/// backend would apply the contextual filter: a user owned by another party
/// is reported as not found.
#[derive(Debug, Default)]
pub struct InMemoryUserRoleStore {
    human_users: UserTable,
    api_users: UserTable,
    roles: RwLock<HashMap<RoleName, Role>>,
    unavailable: AtomicBool,
}

impl InMemoryUserRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_role(&self, role: Role) {
        write(&self.roles).insert(role.name.clone(), role);
    }

    pub fn upsert_human_user(&self, user_id: UserId, scope: PartyScope, roles: Vec<RoleName>) {
        Self::upsert_user(&self.human_users, user_id, scope, roles);
    }

    pub fn upsert_api_user(&self, user_id: UserId, scope: PartyScope, roles: Vec<RoleName>) {
        Self::upsert_user(&self.api_users, user_id, scope, roles);
    }

    /// Attach login credentials to an existing user.
    pub fn set_login(
        &self,
        kind: UserKind,
        user_id: &UserId,
        username: impl Into<String>,
        email_address: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Result<(), StoreError> {
        let mut users = write(self.table(kind));
        let entry = users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::UserNotFound(user_id.clone()))?;
        entry.login = Some(LoginEntry {
            username: username.into(),
            email_address: email_address.into(),
            password_hash: password_hash.into(),
        });
        Ok(())
    }

    /// Simulate an outage: every lookup fails until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store marked unavailable".to_string()));
        }
        Ok(())
    }

    fn table(&self, kind: UserKind) -> &UserTable {
        match kind {
            UserKind::Human => &self.human_users,
            UserKind::Api => &self.api_users,
        }
    }

    fn upsert_user(table: &UserTable, user_id: UserId, scope: PartyScope, roles: Vec<RoleName>) {
        let mut users = write(table);
        let login = users.remove(&user_id).and_then(|entry| entry.login);
        users.insert(user_id, UserEntry { scope, roles, login });
    }

    fn lookup(&self, kind: UserKind, acting: &Claims, user_id: &UserId) -> Result<Vec<RoleName>, StoreError> {
        self.check_available()?;

        read(self.table(kind))
            .get(user_id)
            .filter(|entry| is_visible(acting, &entry.scope.party_id, None))
            .map(|entry| entry.roles.clone())
            .ok_or_else(|| StoreError::UserNotFound(user_id.clone()))
    }
}

#[async_trait]
impl UserRoleStore for InMemoryUserRoleStore {
    async fn human_user_roles(&self, acting: &Claims, user_id: &UserId) -> Result<Vec<RoleName>, StoreError> {
        self.lookup(UserKind::Human, acting, user_id)
    }

    async fn api_user_roles(&self, acting: &Claims, user_id: &UserId) -> Result<Vec<RoleName>, StoreError> {
        self.lookup(UserKind::Api, acting, user_id)
    }

    async fn role(&self, name: &RoleName) -> Result<Role, StoreError> {
        self.check_available()?;
        read(&self.roles)
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::RoleNotFound(name.clone()))
    }
}

#[async_trait]
impl UserCredentialStore for InMemoryUserRoleStore {
    async fn credentials(
        &self,
        acting: &Claims,
        kind: UserKind,
        identifier: &UserIdentifier,
    ) -> Result<Option<StoredCredentials>, StoreError> {
        self.check_available()?;

        let users = read(self.table(kind));
        let found = users.iter().find_map(|(user_id, entry)| {
            let login = entry.login.as_ref()?;
            (login.matches(identifier) && is_visible(acting, &entry.scope.party_id, None)).then(|| {
                StoredCredentials {
                    user_id: user_id.clone(),
                    scope: entry.scope.clone(),
                    password_hash: login.password_hash.clone(),
                }
            })
        });
        Ok(found)
    }
}
