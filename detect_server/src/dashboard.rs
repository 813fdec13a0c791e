//! Interactive dashboard served as plain HTML.
//!
//! The page holds an upload form with a confidence slider. Every submission re-runs the whole
//! pipeline on the uploaded image: resize, detect, draw and tally. Nothing is kept between
//! submissions.
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart},
    response::{Html, IntoResponse, Response},
    Extension,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::protocol::{class_counts, ClassCount};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, ColorType, RgbImage};

use crate::{
    decode::decode_image,
    draw::draw_detections,
    error::DetectError,
    nn::DetectParams,
    results::class_name,
    AppState,
};

/// Length of the longer image side after resizing.
pub const LONG_SIDE: u32 = 1200;

/// Overlap threshold used for all dashboard detections.
pub const MAX_IOU: f32 = 0.8;

pub const MIN_CONFIDENCE_PERCENT: u32 = 25;
pub const MAX_CONFIDENCE_PERCENT: u32 = 100;
pub const DEFAULT_CONFIDENCE_PERCENT: u32 = 50;

const NO_IMAGE_MESSAGE: &str = "No image is uploaded yet!";
const JPEG_QUALITY: u8 = 90;

/// Everything shown on one rendering of the page.
#[derive(Debug)]
pub struct PageView {
    pub confidence_percent: u32,
    pub uploaded: Option<String>,
    pub detected: Option<String>,
    pub counts: Option<Vec<ClassCount>>,
    pub message: Option<String>,
}

impl Default for PageView {
    fn default() -> Self {
        Self {
            confidence_percent: DEFAULT_CONFIDENCE_PERCENT,
            uploaded: None,
            detected: None,
            counts: None,
            message: None,
        }
    }
}

/// Images and tally produced by one detection run.
#[derive(Debug)]
pub struct DashboardRun {
    pub resized: RgbImage,
    pub annotated: RgbImage,
    pub counts: Vec<ClassCount>,
}

/// Empty dashboard.
pub async fn dashboard_page() -> Html<String> {
    Html(render_page(&PageView::default()))
}

/// Run detection on the submitted form and render the results.
pub async fn dashboard_detect(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut view = PageView::default();

    // A form posted without a multipart body carries no image either
    let result = match multipart {
        Ok(multipart) => detect_submission(state, multipart, &mut view).await,
        Err(rejection) => {
            log::debug!("Dashboard request without multipart body: {}", rejection);
            Err(DetectError::MissingImage)
        }
    };

    match result {
        Ok(()) => Html(render_page(&view)).into_response(),
        Err(DetectError::MissingImage) => {
            view.message = Some(NO_IMAGE_MESSAGE.into());
            Html(render_page(&view)).into_response()
        }
        Err(err) => {
            let status = err.status_code();
            log::warn!("Dashboard request failed: {}", &err);
            view.message = Some(err.to_string());
            (status, Html(render_page(&view))).into_response()
        }
    }
}

async fn detect_submission(
    state: Arc<AppState>,
    mut multipart: Multipart,
    view: &mut PageView,
) -> Result<(), DetectError> {
    let mut image_bytes = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") => {
                let bytes = field.bytes().await?;
                // Browsers submit an empty part when no file was chosen
                if !bytes.is_empty() {
                    image_bytes = Some(bytes);
                }
            }
            Some("confidence") => {
                view.confidence_percent = parse_confidence_percent(&field.text().await?)?;
            }
            _ => (),
        }
    }

    let bytes = image_bytes.ok_or(DetectError::MissingImage)?;
    let params = DetectParams::new(view.confidence_percent as f32 / 100.0, MAX_IOU);

    let run =
        tokio::task::spawn_blocking(move || run_detection(&state, &bytes, &params)).await??;
    log::info!(
        "Dashboard detected {} objects in {}x{} image",
        run.counts.iter().map(|c| c.quantity).sum::<usize>(),
        run.resized.width(),
        run.resized.height()
    );

    view.uploaded = Some(jpeg_data_uri(&run.resized)?);
    view.detected = Some(jpeg_data_uri(&run.annotated)?);
    view.counts = Some(run.counts);

    Ok(())
}

/// Decode, resize, detect and draw.
pub fn run_detection(
    state: &AppState,
    bytes: &[u8],
    params: &DetectParams,
) -> Result<DashboardRun, DetectError> {
    let image = decode_image(bytes)?;
    let resized = resize_long_side(&image, LONG_SIDE);

    let detections = state
        .detector
        .detect(&resized, params)
        .map_err(DetectError::Inference)?;

    let mut annotated = resized.clone();
    draw_detections(&mut annotated, &detections, state.font.as_ref());

    let names: Vec<String> = detections.iter().map(class_name).collect();
    let counts = class_counts(names.iter().map(String::as_str));

    Ok(DashboardRun {
        resized,
        annotated,
        counts,
    })
}

/// Parse the slider value, a whole percentage within the slider range.
pub fn parse_confidence_percent(text: &str) -> Result<u32, DetectError> {
    match text.trim().parse::<u32>() {
        Ok(percent) if (MIN_CONFIDENCE_PERCENT..=MAX_CONFIDENCE_PERCENT).contains(&percent) => {
            Ok(percent)
        }
        _ => Err(DetectError::InvalidConfidence(text.to_owned())),
    }
}

/// Resize `image` so that its longer side is `long_side` pixels, keeping the aspect ratio.
///
/// The shorter side is rounded down. Square images are treated as portrait.
pub fn resize_long_side(image: &RgbImage, long_side: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let scale_side = |side: u32, longer: u32| {
        ((u64::from(side) * u64::from(long_side) / u64::from(longer.max(1))) as u32).max(1)
    };

    let (new_width, new_height) = if height < width {
        (long_side, scale_side(height, width))
    } else {
        (scale_side(width, height), long_side)
    };

    image::imageops::resize(image, new_width, new_height, FilterType::Triangle)
}

fn jpeg_data_uri(image: &RgbImage) -> Result<String, DetectError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
        .map_err(DetectError::Encode)?;

    Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(&buf)))
}

/// Render the complete dashboard page.
pub fn render_page(view: &PageView) -> String {
    let mut columns = String::new();
    if let Some(uploaded) = &view.uploaded {
        columns.push_str(&figure(uploaded, "Uploaded Image"));
    }
    if let Some(detected) = &view.detected {
        columns.push_str(&figure(detected, "Detected Image"));
    }

    let mut panel = String::new();
    if let Some(message) = &view.message {
        panel.push_str(&format!(
            "<p class=\"message\">{}</p>\n",
            escape_html(message)
        ));
    }
    if let Some(counts) = &view.counts {
        panel.push_str("<details open>\n<summary>Detection Results</summary>\n");
        if counts.is_empty() {
            panel.push_str("<p>No objects detected.</p>\n");
        }
        for count in counts {
            panel.push_str(&format!(
                "<div class=\"count\"><p>Class Name: {}</p><p>Quantity: {}</p></div>\n",
                escape_html(&count.class_name),
                count.quantity
            ));
        }
        panel.push_str("</details>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Object Detection</title>
<style>
body {{ font-family: sans-serif; margin: 0; display: flex; }}
aside {{ width: 18rem; padding: 1rem; background: #f0f2f6; min-height: 100vh; }}
main {{ flex: 1; padding: 1rem 2rem; }}
.columns {{ display: flex; gap: 1rem; }}
figure {{ flex: 1; margin: 0; }}
figure img {{ width: 100%; }}
.message {{ color: #b00020; }}
</style>
</head>
<body>
<aside>
<form method="post" action="/dashboard" enctype="multipart/form-data">
<h2>Model Config</h2>
<label for="confidence">Select Model Confidence</label>
<input type="range" id="confidence" name="confidence" min="{min}" max="{max}" value="{value}" oninput="this.nextElementSibling.value = this.value">
<output>{value}</output>
<h2>Image Config</h2>
<label for="image">Choose an image...</label>
<input type="file" id="image" name="image" accept=".jpg,.jpeg,.png,.bmp,.webp">
<p><button type="submit">Detect Objects</button></p>
</form>
</aside>
<main>
<h1>Object Detection</h1>
<div class="columns">
{columns}</div>
{panel}</main>
</body>
</html>
"#,
        min = MIN_CONFIDENCE_PERCENT,
        max = MAX_CONFIDENCE_PERCENT,
        value = view.confidence_percent,
        columns = columns,
        panel = panel,
    )
}

fn figure(src: &str, caption: &str) -> String {
    format!("<figure><img src=\"{src}\" alt=\"{caption}\"><figcaption>{caption}</figcaption></figure>\n")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
