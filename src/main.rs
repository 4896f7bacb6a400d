// src/main.rs
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use restaurant_map::auth::{OAuthFlow, SessionStore};
use restaurant_map::common::{migrations, AppConfig, AppState, Clock, SystemClock};
use restaurant_map::restaurants::RestaurantRepository;
use restaurant_map::services::GoogleService;

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = Arc::new(AppConfig::from_env());
    info!(
        database_url = %config.database_url,
        frontend_url = %config.frontend_url,
        "Configuration loaded"
    );

    if !config.google.is_configured() {
        warn!("GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET not set, sign-in will fail");
    }
    if !config.cookie_secure {
        warn!("COOKIE_SECURE is off, session cookies are sent over plain HTTP");
    }

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    // Run database migrations
    migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let google_service = Arc::new(GoogleService::new(config.google.clone()));
    info!("GoogleService initialized");

    let sessions = SessionStore::new(pool.clone(), clock.clone());
    let oauth = Arc::new(OAuthFlow::new(
        google_service,
        pool.clone(),
        sessions.clone(),
        clock,
    ));
    info!("OAuthFlow initialized");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState {
        config: config.clone(),
        sessions,
        oauth,
        restaurants: RestaurantRepository::new(pool),
    };

    let app = restaurant_map::build_router(app_state);

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
