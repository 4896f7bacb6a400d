// src/lib.rs
//! Restaurant map: Google sign-in, per-user restaurant storage and the
//! headless core of the map frontend.

use axum::{
    extract::Extension,
    http::{header, HeaderValue, Method},
    middleware, Router,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// ============================================================================
// MODULES
// ============================================================================

pub mod auth;
pub mod client;
pub mod common;
pub mod request_logging;
pub mod restaurants;
pub mod services;

use common::AppState;

// ============================================================================
// ROUTER COMPOSITION
// ============================================================================

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let shared = Arc::new(RwLock::new(state));

    Router::new()
        // ====================================================================
        // AUTHENTICATION ROUTES
        // ====================================================================
        .merge(auth::auth_routes())
        // ====================================================================
        // RESTAURANT ROUTES
        // ====================================================================
        .merge(restaurants::restaurants_routes())
        // ====================================================================
        // MIDDLEWARE AND LAYERS
        // ====================================================================
        .layer(middleware::from_fn(request_logging::log_requests))
        .layer(Extension(shared))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // credentials are required for the session cookie
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
