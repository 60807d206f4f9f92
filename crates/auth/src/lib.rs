//! `keystone-auth`: token-based authentication and authorization core.
//!
//! Claims are wrapped in a typed envelope, signed into compact tokens, and
//! checked on every request by the [`Authorizer`]. Session tokens come from
//! the [`LoginService`]. Nothing here knows about HTTP or a particular
//! database.

pub mod authorize;
pub mod claims;
pub mod config;
pub mod filter;
pub mod login;
pub mod permissions;
pub mod resolver;
pub mod roles;
pub mod store;
pub mod token;
pub mod user;
pub mod wrapped;

pub use authorize::{AuthError, AuthErrorKind, Authorizer, granted_operations};
pub use claims::{ClaimKind, ClaimWindow, Claims, RegistrationGrant, ResetPasswordGrant, SessionLogin};
pub use config::{AuthConfig, ConfigError, MAX_LIFETIME_MINUTES};
pub use filter::{contextualize, is_visible};
pub use login::{
    LoginError, LoginService, PasswordVerifier, StoredCredentials, UserCredentialStore, UserIdentifier, UserKind,
};
pub use permissions::{ApiPermission, ViewPermission, operations};
pub use resolver::{PermissionError, PermissionResolver, RolePermissionResolver, StoreError, UserRoleStore};
pub use roles::{Role, RoleName};
pub use store::InMemoryUserRoleStore;
pub use token::{RsaKeyPair, SIGNING_ALGORITHM, TokenError, TokenIssuer, TokenValidator};
pub use user::HumanUser;
pub use wrapped::{UnwrapError, WrapError, Wrapped};
