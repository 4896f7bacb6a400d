//! CSRF state tokens issued before redirecting to the identity provider

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::models::AuthError;
use crate::common::{mask_token, Clock};

/// 32 random bytes, well above the 128 bit minimum
const STATE_BYTES: usize = 32;

pub fn state_lifetime() -> Duration {
    Duration::minutes(10)
}

/// Shared by every in-flight login. Each token can be consumed once.
#[derive(Clone)]
pub struct PendingStates {
    entries: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
    clock: Arc<dyn Clock>,
}

impl PendingStates {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Generates and records a fresh token
    pub async fn issue(&self) -> String {
        let mut bytes = [0u8; STATE_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let state = URL_SAFE_NO_PAD.encode(bytes);

        self.entries
            .lock()
            .await
            .insert(state.clone(), self.clock.now());

        debug!(state = %mask_token(&state), "Issued OAuth state");
        state
    }

    /// Check-and-delete under one lock, so a replayed or concurrently
    /// presented token succeeds at most once.
    pub async fn consume(&self, state: &str) -> Result<(), AuthError> {
        let issued_at = self.entries.lock().await.remove(state);

        let Some(issued_at) = issued_at else {
            return Err(AuthError::InvalidState);
        };

        if self.clock.now() - issued_at > state_lifetime() {
            return Err(AuthError::ExpiredState);
        }
        Ok(())
    }

    /// Drops every token older than the lifetime; returns how many went
    pub async fn purge_expired(&self) -> usize {
        let cutoff = self.clock.now() - state_lifetime();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, issued_at| *issued_at >= cutoff);
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged, "Purged expired OAuth states");
        }
        purged
    }

    pub async fn contains(&self, state: &str) -> bool {
        self.entries.lock().await.contains_key(state)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
