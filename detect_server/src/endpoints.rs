//! Endpoints of HTTP server.
//!
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart},
    Extension, Json,
};
use common::protocol::DetectionResponse;

use crate::{
    decode::decode_image, error::DetectError, nn::DetectParams, results::build_response,
    AppState,
};

/// Confidence threshold of the JSON endpoint.
pub const API_MIN_CONFIDENCE: f32 = 0.35;

/// Overlap threshold of the JSON endpoint.
pub const API_MAX_IOU: f32 = 0.7;

/// Welcome endpoint.
pub async fn index() -> &'static str {
    "Welcome to Object Detection API"
}

/// Health check endpoint.
pub async fn healthcheck() -> &'static str {
    "healthy"
}

/// Detect objects in the image sent as multipart field `image`.
pub async fn detect_objects(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionResponse>, DetectError> {
    let mut multipart = multipart?;
    let mut image_bytes = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("image") {
            image_bytes = Some(field.bytes().await?);
            break;
        }
    }
    let bytes = image_bytes.ok_or(DetectError::MissingImage)?;

    let response = tokio::task::spawn_blocking(move || {
        let image = decode_image(&bytes)?;
        let (width, height) = image.dimensions();

        let params = DetectParams::new(API_MIN_CONFIDENCE, API_MAX_IOU);
        let detections = state
            .detector
            .detect(&image, &params)
            .map_err(DetectError::Inference)?;
        log::info!(
            "Detected {} objects in {}x{} image",
            detections.len(),
            width,
            height
        );

        Ok::<_, DetectError>(build_response(width, height, &detections))
    })
    .await??;

    Ok(Json(response))
}
