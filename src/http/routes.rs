//! Axum router configuration

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::files::{download_file, list_downloads};
use super::handlers::{
    check_playlist, health_check, job_stats, job_status, start_download, version_check,
};

/// Browser clients poll from other origins
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::ORIGIN])
        .max_age(Duration::from_secs(3600))
}

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        // Health and version endpoints
        .route("/health", get(health_check))
        .route("/version", get(version_check))
        // Debug endpoints
        .route("/debug/jobs", get(job_stats))
        // Jobs
        .route("/download", post(start_download))
        .route("/check-playlist", post(check_playlist))
        .route("/status/{download_id}", get(job_status))
        // Finished files
        .route("/downloads", get(list_downloads))
        .route("/download_file/{filename}", get(download_file))
        // Middleware
        .layer(TraceLayer::new_for_http());

    let router = if state.config.cors_enabled {
        router.layer(cors_layer())
    } else {
        router
    };

    router.with_state(state)
}
