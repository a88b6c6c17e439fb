use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::response::{IntoResponse, Response};
use common_auth::{AuthError, GuardError, Role};
use common_http_errors::ApiError;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation { code: &'static str, message: String },
    #[error("User already exists")]
    DuplicateUser,
    #[error("User does not exist")]
    UserNotFound,
    #[error("incorrect password")]
    IncorrectPassword,
    #[error("item {0} does not exist")]
    ItemNotFound(i64),
    #[error("order {0} does not exist")]
    OrderNotFound(i64),
    #[error("you are not an {required}")]
    Forbidden { required: Role },
    #[error("you do not have enough money in your bank")]
    InsufficientFunds,
    #[error("order {order_id} has unrecognized status '{status}'")]
    InvalidState { order_id: i64, status: String },
    #[error("order {0} was changed by another request")]
    ConcurrentUpdate(i64),
    #[error("can't remove item {0} while orders reference it")]
    ItemInUse(i64),
    #[error("user '{0}' exists and is not an admin")]
    AdminNameTaken(String),
    #[error("failed to hash password: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl ServiceError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { code, message: message.into() }
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation("invalid_body", rejection.body_text())
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation("invalid_path", rejection.body_text())
    }
}

impl From<GuardError> for ServiceError {
    fn from(value: GuardError) -> Self {
        match value {
            GuardError::Forbidden { required } => Self::Forbidden { required },
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        let message = Some(value.to_string());
        match value {
            ServiceError::Validation { code, .. } => ApiError::BadRequest { code, message },
            ServiceError::DuplicateUser => ApiError::BadRequest { code: "user_exists", message },
            ServiceError::UserNotFound => ApiError::BadRequest { code: "user_not_found", message },
            ServiceError::IncorrectPassword => ApiError::BadRequest { code: "incorrect_password", message },
            ServiceError::ItemNotFound(_) => ApiError::NotFound { code: "item_not_found", message },
            ServiceError::OrderNotFound(_) => ApiError::NotFound { code: "order_not_found", message },
            ServiceError::Forbidden { required } => ApiError::ForbiddenMissingRole { role: required.as_str() },
            ServiceError::InsufficientFunds => ApiError::NotAcceptable { code: "insufficient_funds", message },
            ServiceError::InvalidState { .. } => ApiError::Conflict { code: "invalid_order_state", message },
            ServiceError::ConcurrentUpdate(_) => ApiError::Conflict { code: "concurrent_update", message },
            ServiceError::ItemInUse(_) => ApiError::Forbidden { code: "item_in_use", message },
            ServiceError::AdminNameTaken(_) => ApiError::Conflict { code: "admin_name_taken", message },
            ServiceError::Auth(err) => err.into(),
            ServiceError::PasswordHash(err) => {
                error!(error = %err, "password hashing failed");
                ApiError::Internal { message: Some("failed to process credentials".into()) }
            }
            ServiceError::Storage(err) => {
                error!(error = %err, "storage operation failed");
                ApiError::Internal { message: Some("storage error".into()) }
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: ServiceError) -> StatusCode {
        ApiError::from(err).status()
    }

    #[test]
    fn taxonomy_maps_to_documented_statuses() {
        assert_eq!(status_of(ServiceError::DuplicateUser), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ServiceError::UserNotFound), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ServiceError::IncorrectPassword), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ServiceError::Forbidden { required: Role::Admin }), StatusCode::FORBIDDEN);
        assert_eq!(status_of(ServiceError::InsufficientFunds), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(status_of(ServiceError::OrderNotFound(4)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(ServiceError::InvalidState { order_id: 1, status: "lost".into() }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(ServiceError::ItemInUse(2)), StatusCode::FORBIDDEN);
        assert_eq!(status_of(ServiceError::AdminNameTaken("root".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(ServiceError::Auth(AuthError::MissingToken)), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(ServiceError::Storage(StoreError::Database(sqlx::Error::PoolTimedOut))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_details_are_not_leaked() {
        let api = ApiError::from(ServiceError::Storage(StoreError::InvalidRow("user 3".into())));
        match api {
            ApiError::Internal { message } => assert_eq!(message.as_deref(), Some("storage error")),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
