//! # HTTP Server
//!
//! ## Routes
//!
//! - `GET /`: service status
//! - `GET /health`: health check
//! - `POST /api/virtual-tryon`: multipart `person_image` + `clothing_image`, answers with a PNG
//!
//! CORS is open on every route.

pub mod routes;
pub mod tryon;
pub mod upload;

pub use tryon::TryOnService;
pub use upload::{UploadPair, UploadedImage, MISSING_IMAGES};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// State shared by all handlers. Holds no per-request data.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TryOnService>,
}

impl AppState {
    pub fn new(service: TryOnService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Builds the application router.
///
/// `max_upload_bytes` bounds the size of a try-on request body.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health_check))
        .route(
            "/api/virtual-tryon",
            post(tryon::virtual_tryon).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
