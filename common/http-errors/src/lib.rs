use axum::{http::{StatusCode, HeaderValue}, response::{IntoResponse, Response}, Json};
use serde::Serialize;

/// JSON shape of every error response: `{"error": ..., "code": ...}`.
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")] pub missing_role: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized { code: &'static str, message: String },
    ForbiddenMissingRole { role: &'static str },
    Forbidden { code: &'static str, message: Option<String> },
    BadRequest { code: &'static str, message: Option<String> },
    NotFound { code: &'static str, message: Option<String> },
    NotAcceptable { code: &'static str, message: Option<String> },
    Conflict { code: &'static str, message: Option<String> },
    Internal { message: Option<String> },
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E) -> Self { Self::Internal { message: Some(e.to_string()) } }
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self { Self::BadRequest { code, message: Some(message.into()) } }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::ForbiddenMissingRole { .. } | ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized { code, .. }
            | ApiError::Forbidden { code, .. }
            | ApiError::BadRequest { code, .. }
            | ApiError::NotFound { code, .. }
            | ApiError::NotAcceptable { code, .. }
            | ApiError::Conflict { code, .. } => *code,
            ApiError::ForbiddenMissingRole { .. } => "missing_role",
            ApiError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.code();
        let body = match self {
            ApiError::Unauthorized { code, message } => ErrorBody { error: message, code: code.into(), missing_role: None },
            ApiError::ForbiddenMissingRole { role } => ErrorBody {
                error: format!("you are not an {role}"),
                code: error_code.into(),
                missing_role: Some(role.into()),
            },
            ApiError::Forbidden { code, message }
            | ApiError::BadRequest { code, message }
            | ApiError::NotFound { code, message }
            | ApiError::NotAcceptable { code, message }
            | ApiError::Conflict { code, message } => ErrorBody {
                error: message.unwrap_or_else(|| code.replace('_', " ")),
                code: code.into(),
                missing_role: None,
            },
            ApiError::Internal { message } => ErrorBody {
                error: message.unwrap_or_else(|| "internal error".into()),
                code: error_code.into(),
                missing_role: None,
            },
        };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(error_code) {
            resp.headers_mut().insert("X-Error-Code", val);
        }
        resp
    }
}
