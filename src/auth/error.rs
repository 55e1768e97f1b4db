use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::auth::dto::ErrorBody;

pub const MISSING_FIELDS_MESSAGE: &str = "Email, password and name are required";
pub const USER_EXISTS_MESSAGE: &str = "User with this email already exists";
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Outcome of a failed registration.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("{0}")]
    Validation(String),

    #[error("User with this email already exists")]
    Conflict,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RegisterError {
    pub fn missing_fields() -> Self {
        RegisterError::Validation(MISSING_FIELDS_MESSAGE.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RegisterError::Validation(_) | RegisterError::Conflict => StatusCode::BAD_REQUEST,
            RegisterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RegisterError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            RegisterError::Validation(msg) => msg.clone(),
            RegisterError::Conflict => USER_EXISTS_MESSAGE.to_string(),
            RegisterError::Internal(cause) => {
                error!(error = %format!("{cause:#}"), "registration failed");
                INTERNAL_MESSAGE.to_string()
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(RegisterError::missing_fields().status(), StatusCode::BAD_REQUEST);
        assert_eq!(RegisterError::Conflict.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RegisterError::Internal(anyhow::anyhow!("db down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_response_hides_cause() {
        let response = RegisterError::Internal(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
