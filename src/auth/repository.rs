//! Users and their linked provider accounts

use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::models::{OAuthAccount, User};
use crate::common::mask_email;

#[derive(Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OAuthAccount>, sqlx::Error> {
        sqlx::query_as::<_, OAuthAccount>(
            "SELECT * FROM oauth_accounts WHERE provider = ? AND provider_user_id = ?",
        )
        .bind(provider)
        .bind(provider_user_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_user(&self, user_id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Returns the user linked to (provider, subject), creating both rows on
    /// first sight.
    ///
    /// The two inserts share a transaction. When a concurrent first login
    /// wins the race, the unique index on (provider, provider_user_id)
    /// rejects ours and we read back the winner's link instead.
    pub async fn find_or_create(
        &self,
        provider: &str,
        provider_user_id: &str,
        email: &str,
    ) -> Result<String, sqlx::Error> {
        if let Some(account) = self.find_by_provider(provider, provider_user_id).await? {
            debug!(
                provider = %provider,
                provider_id = %provider_user_id,
                user_id = %account.user_id,
                "Found existing linked account"
            );
            return Ok(account.user_id);
        }

        match self.create_linked_user(provider, provider_user_id, email).await {
            Ok(user_id) => Ok(user_id),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!(
                    provider = %provider,
                    provider_id = %provider_user_id,
                    "Concurrent first login detected, reading the existing link"
                );
                match self.find_by_provider(provider, provider_user_id).await? {
                    Some(account) => Ok(account.user_id),
                    None => Err(sqlx::Error::RowNotFound),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn create_linked_user(
        &self,
        provider: &str,
        provider_user_id: &str,
        email: &str,
    ) -> Result<String, sqlx::Error> {
        let user_id = Uuid::new_v4().to_string();
        let account_id = Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO users (id, email) VALUES (?, ?)")
            .bind(&user_id)
            .bind(email)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO oauth_accounts (id, user_id, provider, provider_user_id, email) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&account_id)
        .bind(&user_id)
        .bind(provider)
        .bind(provider_user_id)
        .bind(email)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, user_id = %user_id, "Failed to commit new user");
            e
        })?;

        info!(
            user_id = %user_id,
            email = %mask_email(email),
            provider = %provider,
            "Created new user account"
        );
        Ok(user_id)
    }
}
