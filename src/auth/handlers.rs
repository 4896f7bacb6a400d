//! Authentication handlers

use axum::{
    extract::{Extension, Json, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::extractors::AuthedUser;
use super::models::{CallbackParams, CurrentUser};
use super::sessions::SESSION_COOKIE;
use crate::common::{mask_token, ApiError, AppState};

/// 302 Found
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub fn session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(time::Duration::days(7))
        .build()
}

fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// GET /auth/google - Start Google OAuth flow
/// Redirects the browser to Google's consent page
pub async fn google_oauth_start(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Response {
    let state = state_lock.read().await.clone();

    let auth_url = state.oauth.begin_sign_in().await;
    info!("Redirecting to Google OAuth");

    found(&auth_url)
}

/// GET /auth/google/callback - Handle OAuth callback from Google
///
/// On success the session cookie is set and the browser goes back to the
/// app. Every failure, whatever its cause, lands on the same generic page.
pub async fn google_oauth_callback(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let state = state_lock.read().await.clone();
    let failure = state.config.auth_failure_url();

    if let Some(error) = params.error.as_deref() {
        warn!(oauth_error = %error, "Google OAuth returned error");
        return found(&failure);
    }

    let (Some(code), Some(oauth_state)) = (params.code.as_deref(), params.state.as_deref()) else {
        warn!("OAuth callback without code or state");
        return found(&failure);
    };

    match state.oauth.handle_callback(code, oauth_state).await {
        Ok(sign_in) => {
            info!(user_id = %sign_in.user_id, "OAuth callback completed");
            let jar = jar.add(session_cookie(sign_in.session_id, state.config.cookie_secure));
            (jar, found(&state.config.frontend_url)).into_response()
        }
        Err(e) => {
            warn!(reason = %e, "OAuth sign-in failed");
            found(&failure)
        }
    }
}

/// POST /auth/logout
/// Deletes the session (if any), clears the cookie and returns to the app
pub async fn logout_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let state = state_lock.read().await.clone();

    let session_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    if let Some(session_id) = session_id {
        state.oauth.logout(&session_id).await.map_err(|e| {
            error!(error = %e, session = %mask_token(&session_id), "Failed to delete session");
            ApiError::InternalServer("logout failed".to_string())
        })?;
    }

    let jar = jar.remove(expired_session_cookie());
    Ok((jar, found(&state.config.frontend_url)).into_response())
}

/// GET /user
/// Returns the signed-in user, or 401
#[axum::debug_handler]
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<CurrentUser>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = state.oauth.accounts().find_user(&authed.id).await?;

    match user {
        Some(u) => Ok(Json(CurrentUser {
            user_id: u.id,
            email: u.email,
        })),
        None => {
            warn!(user_id = %authed.id, "Session points at a missing user");
            Err(ApiError::Unauthorized("not signed in".into()))
        }
    }
}
