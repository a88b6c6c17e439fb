use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token signing secret is not configured")]
    MissingSecret,
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("no token supplied")]
    MissingToken,
    #[error("authorization header malformed")]
    InvalidAuthorization,
    #[error("failed to decode token header: {0}")]
    InvalidHeader(String),
    #[error("token uses an unsupported algorithm")]
    UnsupportedAlgorithm,
    #[error("token has expired")]
    Expired,
    #[error("token verification failed: {0}")]
    Verification(String),
    #[error("invalid claim '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("token subject '{0}' no longer matches a user")]
    UnknownSubject(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        match value.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => Self::UnsupportedAlgorithm,
            _ => Self::Verification(value.to_string()),
        }
    }
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingSecret | AuthError::Signing(_) => "token_signing",
            AuthError::MissingToken | AuthError::InvalidAuthorization => "missing_token",
            AuthError::Expired => "token_expired",
            AuthError::UnknownSubject(_) => "unknown_subject",
            AuthError::InvalidHeader(_)
            | AuthError::UnsupportedAlgorithm
            | AuthError::Verification(_)
            | AuthError::InvalidClaim(_, _) => "invalid_token",
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::MissingSecret | AuthError::Signing(_) => ApiError::Internal {
                message: Some("problems with generating token".into()),
            },
            other => ApiError::Unauthorized {
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn signing_failures_are_server_errors() {
        let api: ApiError = AuthError::MissingSecret.into();
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn token_failures_are_unauthorized() {
        for err in [
            AuthError::MissingToken,
            AuthError::Expired,
            AuthError::UnsupportedAlgorithm,
            AuthError::Verification("bad".into()),
            AuthError::UnknownSubject("alice".into()),
        ] {
            let api: ApiError = err.into();
            assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
