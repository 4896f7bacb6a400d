//! Authentication data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// Provider name stored in `oauth_accounts.provider`
pub const GOOGLE_PROVIDER: &str = "google";

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Link between a provider identity and a local user
#[derive(FromRow, Serialize, Debug, Clone)]
pub struct OAuthAccount {
    pub id: String,
    pub user_id: String,
    pub provider: String,
    pub provider_user_id: String,
    pub email: String,
    pub created_at: String,
}

/// Session row; timestamps are unix seconds
#[derive(FromRow, Debug, Clone)]
pub struct SessionRow {
    pub session_id: String,
    pub user_id: String,
    pub created_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Tokens returned by the provider's code exchange
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

/// Verified identity claims; `subject` and `email` are only `None` when
/// the provider left them out, which the flow rejects
#[derive(Debug, Clone, Default)]
pub struct IdentityClaims {
    pub subject: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
}

/// Outcome of a completed sign-in. Setting the cookie is the caller's job.
#[derive(Debug, Clone, PartialEq)]
pub struct SignIn {
    pub user_id: String,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Query string of `GET /auth/google/callback`
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Body of `GET /user`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentUser {
    pub user_id: String,
    pub email: String,
}

/// Every way a sign-in can fail. The HTTP layer collapses all of them into
/// one generic redirect; the variants exist for logs and tests.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unknown or already used OAuth state")]
    InvalidState,

    #[error("OAuth state expired")]
    ExpiredState,

    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("identity token rejected: {0}")]
    InvalidIdentity(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}
