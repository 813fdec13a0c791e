//! Posting images to the object detection endpoint.
//!
use std::path::Path;

use anyhow::{bail, Context, Result};
use common::protocol::{DetectionResponse, ErrorResponse};
use image::ImageFormat;
use reqwest::{multipart, Client};

/// Send the image at `path` to the server at `address` and return the detections.
///
/// A non-success status is turned into an error carrying the message sent by the server.
pub async fn post_image(
    client: &Client,
    address: &str,
    path: impl AsRef<Path>,
) -> Result<DetectionResponse> {
    let path = path.as_ref();
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    log::debug!("Sending {} bytes from {}", data.len(), path.display());

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image")
        .to_owned();
    let part = multipart::Part::bytes(data)
        .file_name(file_name)
        .mime_str(mime_type(path))?;
    let form = multipart::Form::new().part("image", part);

    let resp = client
        .post(format!("http://{}/objectdetection/", address))
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("failed to reach {}", address))?;

    let status = resp.status();
    if !status.is_success() {
        let message = match resp.json::<ErrorResponse>().await {
            Ok(err) => err.error,
            Err(_) => "no error message".to_owned(),
        };
        bail!("server responded with {}: {}", status, message);
    }

    Ok(resp.json::<DetectionResponse>().await?)
}

/// MIME type of an image judged by its file extension.
fn mime_type(path: &Path) -> &'static str {
    match ImageFormat::from_path(path) {
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Gif) => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type(Path::new("a/b/photo.JPG")), "image/jpeg");
        assert_eq!(mime_type(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(mime_type(Path::new("shelf.png")), "image/png");
        assert_eq!(mime_type(Path::new("shelf.webp")), "image/webp");
        assert_eq!(mime_type(Path::new("notes.txt")), "application/octet-stream");
        assert_eq!(mime_type(Path::new("no_extension")), "application/octet-stream");
    }
}
