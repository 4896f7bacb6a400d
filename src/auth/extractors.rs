//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

use super::sessions::SESSION_COOKIE;
use crate::common::{mask_token, ApiError, AppState};

/// Authenticated user extractor
///
/// Resolves the `session_id` cookie to its user. Missing, unknown and
/// expired sessions are all rejected with the same 401.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub session_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        let jar = CookieJar::from_headers(&parts.headers);
        let session_id = match jar.get(SESSION_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => {
                debug!("Authentication failed: no session cookie");
                return Err(ApiError::Unauthorized("not signed in".into()));
            }
        };

        let user_id = app_state
            .sessions
            .validate(&session_id)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    session = %mask_token(&session_id),
                    "Database error validating session"
                );
                ApiError::DatabaseError(e)
            })?;

        match user_id {
            Some(id) => Ok(AuthedUser { id, session_id }),
            None => Err(ApiError::Unauthorized("not signed in".into())),
        }
    }
}
