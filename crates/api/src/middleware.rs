use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use keystone_auth::Authorizer;

use crate::errors::{invalid_request, unauthorized};

/// Largest JSON-RPC request body the middleware will buffer.
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AuthState {
    pub authorizer: Arc<Authorizer>,
}

impl AuthState {
    pub fn new(authorizer: Authorizer) -> Self {
        Self {
            authorizer: Arc::new(authorizer),
        }
    }
}

#[derive(Deserialize)]
struct JsonRpcRequest {
    method: String,
}

/// Authorize a JSON-RPC request for the operation named by its `method`.
///
/// On success the decoded [`Claims`](keystone_auth::Claims) are placed in the
/// request extensions for downstream handlers.
pub async fn authorize_json_rpc(
    State(state): State<AuthState>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = authorization(req.headers())?;

    let (mut parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_REQUEST_BYTES)
        .await
        .map_err(|_| invalid_request("request body could not be read"))?;
    let method = json_rpc_method(&bytes)?;

    let claims = state
        .authorizer
        .authorize(&token, &method)
        .await
        .map_err(|_e| unauthorized())?;

    parts.extensions.insert(claims);
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// The `Authorization` header exactly as sent; tokens carry no scheme prefix.
fn authorization(headers: &HeaderMap) -> Result<String, Response> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(unauthorized)?;

    let token = header.to_str().map_err(|_| unauthorized())?;
    if token.is_empty() {
        return Err(unauthorized());
    }

    Ok(token.to_string())
}

fn json_rpc_method(body: &Bytes) -> Result<String, Response> {
    serde_json::from_slice::<JsonRpcRequest>(body)
        .map(|request| request.method)
        .map_err(|e| {
            tracing::debug!(error = %e, "rejecting non JSON-RPC body");
            invalid_request("expected a JSON-RPC request")
        })
}
