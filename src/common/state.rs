// Application state shared across all modules

use std::sync::Arc;

use super::config::AppConfig;
use crate::auth::{OAuthFlow, SessionStore};
use crate::restaurants::RestaurantRepository;

/// Application state containing services and configuration. Each
/// service owns its handle on the database pool.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
    pub oauth: Arc<OAuthFlow>,
    pub restaurants: RestaurantRepository,
}
