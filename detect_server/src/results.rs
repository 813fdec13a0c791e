//! Formatting of detections into the JSON contract.
//!
use common::protocol::{DetectionEntry, DetectionResponse, Dimension};

use crate::nn::Detection;

/// Label shown for a class, the decimal class id.
pub fn class_name(detection: &Detection) -> String {
    detection.class_id.to_string()
}

/// Convert one detection, truncating its coordinates toward zero.
pub fn to_entry(detection: &Detection) -> DetectionEntry {
    let [x1, y1, x2, y2] = detection.bbox;
    DetectionEntry {
        class_name: class_name(detection),
        bbox: [x1 as i32, y1 as i32, x2 as i32, y2 as i32],
    }
}

/// Build the response for an image of `width x height` pixels.
///
/// Each detection is keyed by its position in `detections`.
pub fn build_response(width: u32, height: u32, detections: &[Detection]) -> DetectionResponse {
    DetectionResponse {
        dimension: Dimension { width, height },
        results: detections.iter().map(to_entry).enumerate().collect(),
    }
}
