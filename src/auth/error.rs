use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::auth::dto::ApiMessage;

/// Failures surfaced by the account operations.
///
/// Lookup failures deliberately share one variant per flow so that the
/// serialized message cannot reveal whether a record exists or a token
/// merely expired.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("User already exists")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid or expired verification code")]
    InvalidVerificationCode,
    #[error("Invalid or expired reset token")]
    InvalidResetToken,
    #[error("User not found")]
    UserNotFound,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_)
            | AuthError::EmailTaken
            | AuthError::InvalidCredentials
            | AuthError::InvalidVerificationCode
            | AuthError::InvalidResetToken
            | AuthError::UserNotFound => StatusCode::BAD_REQUEST,
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Database(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "Something went wrong".to_string()
        } else {
            self.to_string()
        };
        (
            status,
            Json(ApiMessage {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        assert_eq!(
            AuthError::validation("missing field").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::EmailTaken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidVerificationCode.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::InvalidResetToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::UserNotFound.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn transport_and_fault_statuses() {
        assert_eq!(
            AuthError::Unauthorized("no token").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn lookup_failures_carry_reason_free_messages() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(
            AuthError::InvalidVerificationCode.to_string(),
            "Invalid or expired verification code"
        );
        assert_eq!(
            AuthError::InvalidResetToken.to_string(),
            "Invalid or expired reset token"
        );
    }

    #[tokio::test]
    async fn internal_faults_respond_with_a_generic_body() {
        let response = AuthError::Internal(anyhow::anyhow!("db exploded")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!body.contains("db exploded"));
        assert!(body.contains("\"success\":false"));
    }
}
