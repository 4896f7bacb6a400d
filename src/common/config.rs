//! Runtime configuration read from the environment (and `.env` via dotenv)

use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    /// Where the browser lands after sign-in, sign-out, or a failed sign-in
    pub frontend_url: String,
    pub google: GoogleOAuthConfig,
    pub cors_origins: Vec<String>,
    /// Marks the session cookie `Secure`. Off by default because the
    /// reference deployment runs over plain HTTP on localhost.
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://restaurants.db".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);

        let frontend_url = env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .trim_end_matches('/')
            .to_string();

        let google = GoogleOAuthConfig {
            client_id: env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            redirect_uri: env::var("GOOGLE_OAUTH_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8080/auth/google/callback".to_string()),
        };

        let cors_origins = parse_list(
            &env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string()),
        );

        let cookie_secure = env_flag("COOKIE_SECURE");

        Self {
            database_url,
            port,
            frontend_url,
            google,
            cors_origins,
            cookie_secure,
        }
    }

    /// Landing page for every failed sign-in, whatever the cause
    pub fn auth_failure_url(&self) -> String {
        format!("{}/login?error=auth_failed", self.frontend_url)
    }
}

impl GoogleOAuthConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// `"true"` (any case) enables a flag; anything else, or unset, disables it
pub fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
