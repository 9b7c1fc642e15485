use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for email verification.
#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub code: String,
}

/// Request body for requesting a password reset link.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Request body for completing a password reset.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Flat success/failure envelope.
#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Envelope carrying the user projection.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client. The password hash has
/// no field here, so it cannot reach a response through serialization.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_verified: bool,
    pub last_login_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_verified: user.is_verified,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            name: "Test".to_string(),
            is_verified: false,
            verification_token: Some("123456".to_string()),
            verification_token_expires_at: Some(OffsetDateTime::now_utc()),
            reset_password_token: None,
            reset_password_token_expires_at: None,
            last_login_at: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn projection_has_no_password_field() {
        let value = serde_json::to_value(PublicUser::from(sample_user())).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("password_hash"));
        assert!(obj.contains_key("email"));
        assert!(obj.contains_key("is_verified"));
    }

    #[test]
    fn auth_response_never_mentions_a_password() {
        let response = AuthResponse {
            success: true,
            message: "ok".to_string(),
            user: sample_user().into(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("password"));
        assert!(json.contains("test@example.com"));
    }

    #[test]
    fn user_record_skips_its_hash_when_serialized() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
    }
}
