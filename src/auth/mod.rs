//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Google OAuth sign-in with single-use CSRF state
//! - user / provider account linking
//! - cookie sessions with a 7 day absolute expiry
//! - AuthedUser extractor for protected routes

pub mod extractors;
pub mod flow;
pub mod handlers;
pub mod models;
pub mod pending_state;
pub mod repository;
pub mod routes;
pub mod sessions;


pub use extractors::AuthedUser;
pub use flow::{IdentityProvider, OAuthFlow};
pub use models::{AuthError, SignIn, User};
pub use routes::auth_routes;
pub use sessions::{SessionStore, SESSION_COOKIE};
