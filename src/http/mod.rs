//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with all endpoints
//! - Download submission, playlist probing and status polling
//! - Listing and serving finished files
//! - CORS and request tracing middleware

pub mod files;
pub mod handlers;
pub mod routes;

pub use routes::create_router;
