//! Object detection served over HTTP: a JSON endpoint and an interactive dashboard.
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use rusttype::Font;

pub mod config;
pub mod dashboard;
pub mod decode;
pub mod draw;
pub mod endpoints;
pub mod error;
pub mod nn;
pub mod results;
pub mod utils;

use nn::Detector;

/// Read-only state shared by all requests.
pub struct AppState {
    pub detector: Arc<dyn Detector>,
    pub font: Option<Font<'static>>,
}

impl AppState {
    pub fn new(detector: Arc<dyn Detector>, font: Option<Font<'static>>) -> Self {
        Self { detector, font }
    }
}

/// Build the HTTP server with all endpoints.
pub fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(endpoints::index))
        .route("/healthcheck", get(endpoints::healthcheck))
        .route("/objectdetection/", post(endpoints::detect_objects))
        .route(
            "/dashboard",
            get(dashboard::dashboard_page).post(dashboard::dashboard_detect),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(Extension(state))
}
