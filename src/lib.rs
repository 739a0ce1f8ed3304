// =============================================================================
// Farmstead Backend - Application State & Router
// =============================================================================
// Table of Contents:
// 1. Modules
// 2. Application State
// 3. Router Setup
// =============================================================================

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod livestock;
pub mod locations;
pub mod predict;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;

// -----------------------------------------------------------------------------
// 2. Application State
// -----------------------------------------------------------------------------

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
}

// -----------------------------------------------------------------------------
// 3. Router Setup
// -----------------------------------------------------------------------------

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Auth routes
        .route("/auth/register", post(auth::register))
        .route("/auth/token", post(auth::token))
        .route("/auth/me", get(auth::get_current_user))
        .route("/auth/refresh", post(auth::refresh_token))
        // Locations API
        .route("/locations", post(locations::create_location))
        .route("/locations", get(locations::get_locations))
        .route("/locations/:id", get(locations::get_location))
        .route("/locations/:id", patch(locations::update_location))
        .route("/locations/:id", delete(locations::delete_location))
        // Livestock API
        .route("/livestocks", post(livestock::create_livestock))
        .route("/livestocks", get(livestock::get_livestock_list))
        .route("/livestocks/:id", get(livestock::get_livestock))
        .route("/livestocks/:id", patch(livestock::update_livestock))
        .route("/livestocks/:id", delete(livestock::delete_livestock))
        // Predictions API
        .route("/predicts", get(predict::predict_all))
        .route("/predicts/:location_id", get(predict::predict_for_location))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
