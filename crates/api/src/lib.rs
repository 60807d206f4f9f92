//! HTTP adapter: puts the [`Authorizer`](keystone_auth::Authorizer) in front
//! of a JSON-RPC endpoint.

pub mod errors;
pub mod middleware;

pub use middleware::{AuthState, MAX_REQUEST_BYTES, authorize_json_rpc};
