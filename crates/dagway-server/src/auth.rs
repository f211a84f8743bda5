//! Token authentication middleware.
//!
//! When an expected token is configured, every API request must carry it in
//! the configured header. Failures are answered with a 403 envelope before any
//! operation logic runs, and echo none of the request's arguments.
//!
//! # Security
//!
//! Token comparison uses constant-time comparison to prevent timing attacks.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::error::ServerError;
use crate::state::AppState;

/// Message returned for every authentication failure.
pub const AUTH_FAILED_MESSAGE: &str = "Token Authentication Failed";

/// Compare two strings in constant time.
///
/// Lengths are compared first; a length mismatch still performs a dummy
/// comparison so the time taken does not depend on it.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    if a_bytes.len() == b_bytes.len() {
        a_bytes.ct_eq(b_bytes).into()
    } else {
        let _ = a_bytes.ct_eq(a_bytes);
        false
    }
}

/// Authentication middleware function.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ServerError> {
    validate_request(&request, state.config())?;
    Ok(next.run(request).await)
}

fn validate_request(
    request: &Request<Body>,
    config: &crate::config::ServerConfig,
) -> Result<(), ServerError> {
    let Some(ref expected_token) = config.auth_token else {
        return Ok(());
    };

    tracing::debug!(header = %config.token_header, "Performing token authentication");

    let provided = request
        .headers()
        .get(config.token_header.as_str())
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(token) if constant_time_eq(token, expected_token) => Ok(()),
        _ => Err(ServerError::Forbidden(AUTH_FAILED_MESSAGE.to_string())),
    }
}
