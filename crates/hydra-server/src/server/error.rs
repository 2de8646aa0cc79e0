//! REST error mapping.
//!
//! Every module error becomes a status code plus a stable machine-readable
//! code; clients branch on the code, not the message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use hydra_core::db::DatabaseError;

use crate::auth::AuthError;
use crate::engines::EngineError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn invalid_action(action: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "INVALID_ACTION",
            format!("Unknown engine action: {action}"),
        )
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized")
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, message = %self.message, "Request failed");
        }

        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        let message = e.to_string();
        match e {
            AuthError::InvalidInput(_) => {
                Self::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
            }
            AuthError::ChallengeNotFound => {
                Self::new(StatusCode::UNAUTHORIZED, "CHALLENGE_NOT_FOUND", message)
            }
            AuthError::ChallengeExpired => {
                Self::new(StatusCode::UNAUTHORIZED, "CHALLENGE_EXPIRED", message)
            }
            AuthError::SignatureInvalid => {
                Self::new(StatusCode::UNAUTHORIZED, "SIGNATURE_INVALID", message)
            }
            AuthError::TokenInvalid => {
                Self::new(StatusCode::UNAUTHORIZED, "TOKEN_INVALID", message)
            }
            AuthError::TokenExpired => {
                Self::new(StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED", message)
            }
            AuthError::Unauthorized => {
                Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
            }
            AuthError::Storage(e) => e.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        let message = e.to_string();
        match e {
            EngineError::InvalidInput(_) => {
                Self::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
            }
            EngineError::EngineNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "ENGINE_NOT_FOUND", message)
            }
            EngineError::EngineConfigNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "ENGINE_CONFIG_NOT_FOUND", message)
            }
            EngineError::AccessDenied => {
                Self::new(StatusCode::FORBIDDEN, "ACCESS_DENIED", message)
            }
            // A valid bearer token for a user row that no longer exists.
            EngineError::UserNotFound(_) => Self::unauthorized(),
            EngineError::Storage(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL",
            e.to_string(),
        )
    }
}
