// src/services/google.rs
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::auth::models::{AuthError, IdentityClaims, TokenSet};
use crate::auth::IdentityProvider;
use crate::common::GoogleOAuthConfig;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const CERTS_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/certs";
const ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];
const SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// Google rotates its signing keys every few days; an hour is plenty
const JWKS_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Google OAuth not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Google returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    SerializationError(String),

    #[error("No signing key with id {0}")]
    UnknownKey(String),
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Clone, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Claims we read out of a Google ID token
#[derive(Debug, Deserialize)]
struct GoogleIdClaims {
    sub: Option<String>,
    email: Option<String>,
    email_verified: Option<bool>,
}

pub struct GoogleService {
    config: GoogleOAuthConfig,
    client: Client,
    jwks: RwLock<Option<(JwkSet, Instant)>>,
}

impl GoogleService {
    pub fn new(config: GoogleOAuthConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            config,
            client,
            jwks: RwLock::new(None),
        }
    }

    fn ensure_configured(&self) -> Result<(), GoogleError> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(GoogleError::NotConfigured)
        }
    }

    async fn request_tokens(&self, code: &str) -> Result<TokenSet, GoogleError> {
        self.ensure_configured()?;

        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&params)
            .send()
            .await
            .map_err(|e| GoogleError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %body, "Token exchange failed");
            return Err(GoogleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<TokenSet>()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, GoogleError> {
        let response = self
            .client
            .get(CERTS_ENDPOINT)
            .send()
            .await
            .map_err(|e| GoogleError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GoogleError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))
    }

    /// Looks `kid` up in the cached key set, refetching once when the cache
    /// is stale or the key is unknown (Google rotated keys)
    async fn signing_key(&self, kid: &str) -> Result<Jwk, GoogleError> {
        if let Some((set, fetched_at)) = self.jwks.read().await.as_ref() {
            if fetched_at.elapsed() < JWKS_TTL {
                if let Some(key) = set.keys.iter().find(|k| k.kid == kid) {
                    return Ok(key.clone());
                }
            }
        }

        debug!(kid = %kid, "Refreshing Google signing keys");
        let set = self.fetch_jwks().await?;
        let key = set.keys.iter().find(|k| k.kid == kid).cloned();
        *self.jwks.write().await = Some((set, Instant::now()));

        key.ok_or_else(|| GoogleError::UnknownKey(kid.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for GoogleService {
    fn authorization_url(&self, state: &str) -> String {
        let scope_param = SCOPES.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&state={}",
            AUTH_ENDPOINT,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&scope_param),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError> {
        self.request_tokens(code)
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<IdentityClaims, AuthError> {
        let header = decode_header(id_token)
            .map_err(|e| AuthError::InvalidIdentity(format!("malformed token: {}", e)))?;

        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidIdentity(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidIdentity("token has no key id".to_string()))?;

        let jwk = self
            .signing_key(&kid)
            .await
            .map_err(|e| AuthError::InvalidIdentity(e.to_string()))?;

        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| AuthError::InvalidIdentity(format!("bad signing key: {}", e)))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.config.client_id.as_str()]);
        validation.set_issuer(&ISSUERS);

        let data = decode::<GoogleIdClaims>(id_token, &key, &validation).map_err(|e| {
            warn!(error = %e, "Google ID token verification failed");
            AuthError::InvalidIdentity(e.to_string())
        })?;

        if data.claims.email_verified == Some(false) {
            warn!("Google ID token carries an unverified email address");
        }

        Ok(IdentityClaims {
            subject: data.claims.sub,
            email: data.claims.email,
            email_verified: data.claims.email_verified,
        })
    }
}
