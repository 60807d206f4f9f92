use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// The single response for every authorization failure. It never says why.
pub fn unauthorized() -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
}

pub fn invalid_request(message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", message)
}
