use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;
use uuid::Uuid;

use crate::auth::{
    error::AuthError,
    session::{SessionKeys, SESSION_COOKIE},
};

/// Resolves the session cookie to a user ID.
#[derive(Debug)]
pub struct SessionUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(AuthError::Unauthorized("Unauthorized - no token provided"))?;

        let claims = keys.verify(&token).map_err(|e| {
            warn!(error = %e, "invalid or expired session token");
            AuthError::Unauthorized("Unauthorized - invalid token")
        })?;

        Ok(SessionUser(claims.sub))
    }
}
