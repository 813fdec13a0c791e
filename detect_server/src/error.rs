//! Request-level errors and their HTTP representation.
//!
use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::ErrorResponse;
use tokio::task::JoinError;

/// Everything that can go wrong while serving one detection request.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("No image in request")]
    MissingImage,

    #[error("{}", multipart_message(.0))]
    Multipart(#[from] MultipartError),

    #[error("expected a multipart/form-data request: {0}")]
    NotMultipart(#[from] MultipartRejection),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("invalid confidence {0:?}, expected a percentage between 25 and 100")]
    InvalidConfidence(String),

    #[error("failed to encode image: {0}")]
    Encode(image::ImageError),

    #[error("inference failed: {0}")]
    Inference(anyhow::Error),

    #[error("inference task failed: {0}")]
    Task(#[from] JoinError),
}

impl DetectError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DetectError::MissingImage
            | DetectError::InvalidConfidence(_)
            | DetectError::NotMultipart(_) => StatusCode::BAD_REQUEST,
            DetectError::Multipart(err) => err.status(),
            DetectError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DetectError::Encode(_) | DetectError::Inference(_) | DetectError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn multipart_message(err: &MultipartError) -> String {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        "upload exceeds the request size limit".to_owned()
    } else {
        format!("invalid multipart request: {}", err)
    }
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", &self);
        } else {
            log::warn!("Rejected request: {}", &self);
        }

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
