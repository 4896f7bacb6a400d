//! Shared setup for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

use restaurant_map::auth::models::{IdentityClaims, TokenSet, GOOGLE_PROVIDER};
use restaurant_map::auth::{AuthError, IdentityProvider, OAuthFlow, SessionStore};
use restaurant_map::common::{migrations, AppConfig, AppState, Clock, GoogleOAuthConfig, ManualClock};
use restaurant_map::restaurants::RestaurantRepository;

pub const FRONTEND_URL: &str = "http://app.test";

/// Identity provider double: the code is used as the Google subject
pub struct FakeGoogle;

#[async_trait]
impl IdentityProvider for FakeGoogle {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://accounts.google.test/auth?state={}", state)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError> {
        if code == "bad-code" {
            return Err(AuthError::TokenExchangeFailed("invalid_grant".to_string()));
        }
        Ok(TokenSet {
            access_token: Some("access".to_string()),
            id_token: Some(code.to_string()),
            refresh_token: None,
            expires_in: Some(3600),
        })
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<IdentityClaims, AuthError> {
        Ok(IdentityClaims {
            subject: Some(id_token.to_string()),
            email: Some(format!("{}@example.com", id_token)),
            email_verified: Some(true),
        })
    }
}

pub struct TestApp {
    pub pool: SqlitePool,
    pub state: AppState,
    pub clock: ManualClock,
    pub router: Router,
}

impl TestApp {
    /// Creates a user directly and returns a valid session id for them
    pub async fn session_for(&self, subject: &str) -> (String, String) {
        let user_id = self
            .state
            .oauth
            .accounts()
            .find_or_create(GOOGLE_PROVIDER, subject, &format!("{}@example.com", subject))
            .await
            .unwrap();
        let session = self.state.sessions.create(&user_id).await.unwrap();
        (user_id, session.session_id)
    }

    pub async fn restaurant_count(&self) -> i64 {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM restaurants")
            .fetch_one(&self.pool)
            .await
            .unwrap();
        n
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        port: 0,
        frontend_url: FRONTEND_URL.to_string(),
        google: GoogleOAuthConfig::default(),
        cors_origins: vec![FRONTEND_URL.to_string()],
        cookie_secure: false,
    }
}

pub async fn test_app() -> TestApp {
    // one connection that never recycles, so the in-memory database lives
    // as long as the pool
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrations::create_schema(&pool).await.unwrap();

    let clock = ManualClock::new(Utc::now());
    let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
    let sessions = SessionStore::new(pool.clone(), shared_clock.clone());
    let oauth = Arc::new(OAuthFlow::new(
        Arc::new(FakeGoogle),
        pool.clone(),
        sessions.clone(),
        shared_clock,
    ));

    let state = AppState {
        config: Arc::new(test_config()),
        sessions,
        oauth,
        restaurants: RestaurantRepository::new(pool.clone()),
    };

    TestApp {
        router: restaurant_map::build_router(state.clone()),
        pool,
        state,
        clock,
    }
}
