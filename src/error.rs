// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::database::StoreError;
use crate::services::{SubmissionError, WriteError};

/// HTTP API error with its status code and the body the dashboard front end expects
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),
    InvalidCredentials,

    // 405 Method Not Allowed
    MethodNotAllowed,

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    ServerMisconfigured(&'static str),
    StorageError(String),
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::InvalidCredentials => 401,
            ApiError::MethodNotAllowed => 405,
            ApiError::Conflict(_) => 409,
            ApiError::ServerMisconfigured(_) => 500,
            ApiError::StorageError(_) => 500,
            ApiError::Internal(_) => 500,
        }
    }

    /// Client-facing message. Misconfiguration never names the missing setting.
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(reason) => reason,
            ApiError::InvalidCredentials => "Falsches Passwort",
            ApiError::MethodNotAllowed => "Method not allowed",
            ApiError::Conflict(_) => "Konflikt",
            ApiError::ServerMisconfigured(_) => "Server configuration error",
            ApiError::StorageError(_) => "Datenbankfehler",
            ApiError::Internal(_) => "Ein Fehler ist aufgetreten",
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ApiError::Unauthorized(reason) => json!({
                "error": "Unauthorized",
                "message": reason
            }),
            ApiError::InvalidCredentials => json!({
                "success": false,
                "message": self.message()
            }),
            ApiError::Conflict(details) | ApiError::StorageError(details) | ApiError::Internal(details) => json!({
                "error": self.message(),
                "details": details
            }),
            _ => json!({ "error": self.message() }),
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        ApiError::Unauthorized(reason.into())
    }

    pub fn storage(details: impl Into<String>) -> Self {
        ApiError::StorageError(details.into())
    }

    pub fn internal(details: impl Into<String>) -> Self {
        ApiError::Internal(details.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::ServerMisconfigured(var) => ApiError::ServerMisconfigured(var),
            AuthError::MissingToken => ApiError::unauthorized("Kein Token gefunden"),
            AuthError::TokenExpired => ApiError::unauthorized("Token abgelaufen"),
            AuthError::InvalidToken(_) => ApiError::unauthorized("Ungültiger Token"),
            AuthError::TokenGeneration(msg) => ApiError::internal(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConfigMissing(var) => ApiError::ServerMisconfigured(var),
            StoreError::InvalidDatabaseUrl => ApiError::ServerMisconfigured("DATABASE_URL"),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::QueryError(msg) => ApiError::storage(msg),
            StoreError::Sqlx(sqlx_err) => ApiError::storage(sqlx_err.to_string()),
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<WriteError> for ApiError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Invalid(e) => e.into(),
            WriteError::Store(e) => e.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::ServerMisconfigured(var) => write!(f, "{} ({} not set)", self.message(), var),
            ApiError::Conflict(details) | ApiError::StorageError(details) | ApiError::Internal(details) => {
                write!(f, "{}: {}", self.message(), details)
            }
            _ => write!(f, "{}", self.message()),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        (status, Json(self.to_json())).into_response()
    }
}
