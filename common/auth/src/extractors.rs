use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};

use crate::error::{AuthError, AuthResult};

/// Picks the bearer token for a request.
///
/// Clients send the token as a `token` field in the JSON body; an
/// `Authorization: Bearer` header is accepted when the body carries none.
pub fn resolve_token(headers: &HeaderMap, body_token: Option<&str>) -> AuthResult<String> {
    if let Some(token) = body_token.map(str::trim).filter(|token| !token.is_empty()) {
        return Ok(token.to_owned());
    }

    match headers.get(AUTHORIZATION) {
        Some(value) => parse_bearer(value),
        None => Err(AuthError::MissingToken),
    }
}

fn parse_bearer(value: &HeaderValue) -> AuthResult<String> {
    let raw = value
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorization)?
        .trim();

    let token = raw
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthorization)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidAuthorization);
    }

    Ok(token.to_owned())
}
