//! OAuth 2.0 authorization-code sign-in

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

use super::models::{AuthError, IdentityClaims, SignIn, TokenSet, GOOGLE_PROVIDER};
use super::pending_state::PendingStates;
use super::repository::AccountRepository;
use super::sessions::SessionStore;
use crate::common::{mask_email, mask_token, Clock};

/// The identity provider side of the flow
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorization URL carrying `state`, scopes `openid email profile`
    /// and offline access
    fn authorization_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError>;

    /// Checks signature and audience of an ID token
    async fn verify_id_token(&self, id_token: &str) -> Result<IdentityClaims, AuthError>;
}

pub struct OAuthFlow {
    provider: Arc<dyn IdentityProvider>,
    states: PendingStates,
    accounts: AccountRepository,
    sessions: SessionStore,
}

impl OAuthFlow {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        pool: SqlitePool,
        sessions: SessionStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            states: PendingStates::new(clock),
            accounts: AccountRepository::new(pool),
            sessions,
        }
    }

    pub fn pending_states(&self) -> &PendingStates {
        &self.states
    }

    pub fn accounts(&self) -> &AccountRepository {
        &self.accounts
    }

    pub async fn begin_sign_in(&self) -> String {
        let state = self.states.issue().await;
        self.provider.authorization_url(&state)
    }

    pub async fn handle_callback(&self, code: &str, state: &str) -> Result<SignIn, AuthError> {
        let consumed = self.states.consume(state).await;
        self.states.purge_expired().await;
        consumed.map_err(|e| {
            warn!(state = %mask_token(state), reason = %e, "Rejected OAuth callback state");
            e
        })?;

        let tokens = self.provider.exchange_code(code).await?;
        let id_token = tokens
            .id_token
            .ok_or_else(|| AuthError::TokenExchangeFailed("no ID token returned".to_string()))?;

        let claims = self.provider.verify_id_token(&id_token).await?;
        let (subject, email) = match (claims.subject, claims.email) {
            (Some(subject), Some(email)) if !subject.is_empty() && !email.is_empty() => {
                (subject, email)
            }
            _ => {
                return Err(AuthError::InvalidIdentity(
                    "identity token is missing subject or email".to_string(),
                ))
            }
        };

        let user_id = self
            .accounts
            .find_or_create(GOOGLE_PROVIDER, &subject, &email)
            .await?;
        let session = self.sessions.create(&user_id).await?;

        info!(
            user_id = %user_id,
            email = %mask_email(&email),
            provider = GOOGLE_PROVIDER,
            "User signed in"
        );

        Ok(SignIn {
            user_id,
            session_id: session.session_id,
            expires_at: session.expires_at,
        })
    }

    pub async fn logout(&self, session_id: &str) -> Result<(), AuthError> {
        self.sessions.delete(session_id).await?;
        info!(session = %mask_token(session_id), "User logged out");
        Ok(())
    }
}
