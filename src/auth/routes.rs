//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /auth/google` - Redirect to Google's consent page
/// - `GET /auth/google/callback` - Finish sign-in, set the session cookie
/// - `POST /auth/logout` - Drop the session and its cookie
/// - `GET /user` - Current user, or 401
pub fn auth_routes() -> Router {
    Router::new()
        .route("/auth/google", get(handlers::google_oauth_start))
        .route("/auth/google/callback", get(handlers::google_oauth_callback))
        .route("/auth/logout", post(handlers::logout_handler))
        .route("/user", get(handlers::me_handler))
}
