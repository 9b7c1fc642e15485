use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ApiMessage, AuthResponse, ForgotPasswordRequest, LoginRequest, PublicUser,
            ResetPasswordRequest, SignupRequest, VerifyEmailRequest,
        },
        error::AuthError,
        extractors::SessionUser,
        password,
        repo_types::User,
        session::{self, SessionKeys},
        tokens,
    },
    state::AppState,
};

/// Verification codes stay redeemable for this long after signup.
const VERIFICATION_TTL: Duration = Duration::hours(24);
/// Reset tokens are single-use and short-lived.
const RESET_TTL: Duration = Duration::hours(1);

/// Sent for known and unknown addresses alike, so the endpoint does not
/// reveal which emails have an account.
const RESET_SENT_MESSAGE: &str = "If that email is registered, a password reset link has been sent";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/verify-email", post(verify_email))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/:token", post(reset_password))
        .route("/check-auth", get(check_auth))
}

#[instrument(skip(state, jar, payload))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AuthError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();

    if payload.email.is_empty() || payload.password.is_empty() || payload.name.is_empty() {
        warn!("signup with missing fields");
        return Err(AuthError::validation("All fields are required"));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AuthError::validation("Invalid email"));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(AuthError::validation("Password too short"));
    }

    // Fast path only; the UNIQUE constraint at insert is the real guard.
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AuthError::EmailTaken);
    }

    let hash = password::hash_password_blocking(payload.password).await?;
    let code = tokens::verification_code();
    let expires_at = OffsetDateTime::now_utc() + VERIFICATION_TTL;

    let user = User::create(&state.db, &payload.email, &hash, &payload.name, &code, expires_at)
        .await?;

    let keys = SessionKeys::from_ref(&state);
    let cookie = keys.session_cookie(user.id)?;

    // The user row is committed; a mail fault degrades the message only.
    let message = match state.mailer.send_verification(&user.email, &code).await {
        Ok(()) => "User created successfully".to_string(),
        Err(e) => {
            warn!(error = %e, user_id = %user.id, "verification email failed");
            "User created, but the verification email could not be sent".to_string()
        }
    };

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(AuthResponse {
            success: true,
            message,
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<Json<ApiMessage>, AuthError> {
    let code = payload.code.trim();
    if code.is_empty() {
        return Err(AuthError::validation("Verification code is required"));
    }

    // Wrong code and expired code are indistinguishable to the caller.
    let user = User::consume_verification_token(&state.db, code)
        .await?
        .ok_or(AuthError::InvalidVerificationCode)?;

    let message = match state.mailer.send_welcome(&user.email, &user.name).await {
        Ok(()) => "Email verified successfully".to_string(),
        Err(e) => {
            warn!(error = %e, user_id = %user.id, "welcome email failed");
            "Email verified successfully, but the welcome email could not be sent".to_string()
        }
    };

    info!(user_id = %user.id, "email verified");
    Ok(Json(ApiMessage::ok(message)))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AuthError::validation("All fields are required"));
    }

    // Unknown email and wrong password must yield the same error.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    let ok =
        password::verify_password_blocking(payload.password, user.password_hash.clone()).await?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let user = User::record_login(&state.db, user.id).await?;

    let keys = SessionKeys::from_ref(&state);
    let cookie = keys.session_cookie(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        jar.add(cookie),
        Json(AuthResponse {
            success: true,
            message: "Logged in successfully".to_string(),
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<ApiMessage>) {
    (
        jar.remove(session::removal_cookie()),
        Json(ApiMessage::ok("Logged out successfully")),
    )
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiMessage>, AuthError> {
    payload.email = payload.email.trim().to_lowercase();
    if payload.email.is_empty() {
        return Err(AuthError::validation("Email is required"));
    }

    // Unknown addresses get the generic response with no record touched.
    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        info!("password reset requested for unknown email");
        return Ok(Json(ApiMessage::ok(RESET_SENT_MESSAGE)));
    };

    let token = tokens::reset_token();
    let expires_at = OffsetDateTime::now_utc() + RESET_TTL;

    // Overwrites any pending pair; only the newest token redeems.
    let Some(user) = User::set_reset_token(&state.db, user.id, &token, expires_at).await? else {
        return Ok(Json(ApiMessage::ok(RESET_SENT_MESSAGE)));
    };

    let reset_url = format!(
        "{}/reset-password/{}",
        state.config.client_url.trim_end_matches('/'),
        token
    );
    // Keep the response generic even when the mail bounces; detail goes to
    // the log only.
    if let Err(e) = state.mailer.send_password_reset(&user.email, &reset_url).await {
        warn!(error = %e, user_id = %user.id, "password reset email failed");
    }

    info!(user_id = %user.id, "password reset link issued");
    Ok(Json(ApiMessage::ok(RESET_SENT_MESSAGE)))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiMessage>, AuthError> {
    if payload.password.is_empty() {
        return Err(AuthError::validation("Password is required"));
    }
    if payload.password.len() < 8 {
        return Err(AuthError::validation("Password too short"));
    }

    // Hash before the consume so the conditional UPDATE stays one statement.
    let hash = password::hash_password_blocking(payload.password).await?;

    let user = User::consume_reset_token(&state.db, &token, &hash)
        .await?
        .ok_or(AuthError::InvalidResetToken)?;

    let message = match state.mailer.send_reset_success(&user.email).await {
        Ok(()) => "Password reset successfully".to_string(),
        Err(e) => {
            warn!(error = %e, user_id = %user.id, "reset confirmation email failed");
            "Password reset successfully, but the confirmation email could not be sent".to_string()
        }
    };

    info!(user_id = %user.id, "password reset");
    Ok(Json(ApiMessage::ok(message)))
}

#[instrument(skip(state))]
pub async fn check_auth(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> Result<Json<AuthResponse>, AuthError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Authenticated".to_string(),
        user: PublicUser::from(user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    use crate::state::AppState;

    #[test]
    fn email_regex_accepts_and_rejects() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@x.com"));
    }

    #[tokio::test]
    async fn signup_requires_all_fields() {
        let err = signup(
            State(AppState::fake()),
            CookieJar::default(),
            Json(SignupRequest {
                email: "".to_string(),
                password: "".to_string(),
                name: "".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn signup_rejects_malformed_email() {
        let err = signup(
            State(AppState::fake()),
            CookieJar::default(),
            Json(SignupRequest {
                email: "not-an-email".to_string(),
                password: "secret123".to_string(),
                name: "Ann".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn signup_rejects_short_password() {
        let err = signup(
            State(AppState::fake()),
            CookieJar::default(),
            Json(SignupRequest {
                email: "a@x.com".to_string(),
                password: "short".to_string(),
                name: "Ann".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn login_requires_credentials() {
        let err = login(
            State(AppState::fake()),
            CookieJar::default(),
            Json(LoginRequest {
                email: " ".to_string(),
                password: "".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn verify_email_requires_code() {
        let err = verify_email(
            State(AppState::fake()),
            Json(VerifyEmailRequest {
                code: "   ".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn forgot_password_requires_email() {
        let err = forgot_password(
            State(AppState::fake()),
            Json(ForgotPasswordRequest {
                email: "".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn reset_password_rejects_short_password() {
        let err = reset_password(
            State(AppState::fake()),
            Path("deadbeef".to_string()),
            Json(ResetPasswordRequest {
                password: "short".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn logout_clears_the_session_cookie() {
        let response = logout(CookieJar::default()).await.into_response();
        let set_cookie = response
            .headers()
            .get(axum::http::header::SET_COOKIE)
            .expect("set-cookie header");
        assert!(set_cookie.to_str().unwrap().starts_with("token="));
    }
}
