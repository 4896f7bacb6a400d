//! Session store: opaque session ids with an absolute 7 day expiry

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::models::{Session, SessionRow};
use crate::common::{mask_token, Clock};

pub const SESSION_COOKIE: &str = "session_id";

pub fn session_lifetime() -> Duration {
    Duration::days(7)
}

#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    pub async fn create(&self, user_id: &str) -> Result<Session, sqlx::Error> {
        let now = self.clock.now();
        let session = Session {
            session_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + session_lifetime(),
        };

        sqlx::query(
            "INSERT INTO sessions (session_id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.session_id)
        .bind(&session.user_id)
        .bind(session.created_at.timestamp())
        .bind(session.expires_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "Database error creating session");
            e
        })?;

        info!(
            user_id = %user_id,
            session = %mask_token(&session.session_id),
            expires_at = %session.expires_at,
            "Session created"
        );
        Ok(session)
    }

    /// Returns the owning user only while the session exists and has not
    /// expired. Callers cannot tell "unknown" from "expired"; the log can.
    pub async fn validate(&self, session_id: &str) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT session_id, user_id, created_at, expires_at FROM sessions WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            debug!(session = %mask_token(session_id), "Session not found");
            return Ok(None);
        };

        let now = self.clock.now().timestamp();
        if row.expires_at > now {
            return Ok(Some(row.user_id));
        }

        debug!(
            session = %mask_token(session_id),
            user_id = %row.user_id,
            expired_at = row.expires_at,
            "Session expired, removing"
        );
        self.delete(session_id).await?;
        Ok(None)
    }

    /// Deleting a session that does not exist is not an error
    pub async fn delete(&self, session_id: &str) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        debug!(
            session = %mask_token(session_id),
            removed = result.rows_affected(),
            "Session delete"
        );
        Ok(())
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<Session>, sqlx::Error> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT session_id, user_id, created_at, expires_at FROM sessions WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Session {
            session_id: r.session_id,
            user_id: r.user_id,
            created_at: from_unix(r.created_at),
            expires_at: from_unix(r.expires_at),
        }))
    }
}

fn from_unix(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}
