//! Detector adapter around a YOLO model in ONNX format.
//!
//! The model is expected to follow the YOLOv8 export layout: one input of shape `[1, 3, S, S]`
//! with RGB values in `[0, 1]` and one output of shape `[1, 4 + C, N]` holding `cx, cy, w, h`
//! followed by `C` class scores for each of the `N` anchors.
use std::path::Path;

use anyhow::{bail, Result};
use image::{imageops::FilterType, Rgb, RgbImage};
use tract_onnx::prelude::*;

type NnModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Bounding box `[x_top_left, y_top_left, x_bottom_right, y_bottom_right]` in pixels.
pub type Bbox = [f32; 4];

/// Positive additive constant to avoid divide-by-zero.
const EPS: f32 = 1.0e-7;

/// Grey value of the letterbox padding.
const PAD_VALUE: u8 = 114;

/// Side length of the square model input if not configured otherwise.
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Upper bound of detections reported for one image.
pub const MAX_DETECTIONS: usize = 300;

/// One predicted object instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: Bbox,
}

/// Thresholds applied to the raw model output of one call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectParams {
    pub min_confidence: f32,
    pub max_iou: f32,
}

impl DetectParams {
    pub fn new(min_confidence: f32, max_iou: f32) -> Self {
        Self {
            min_confidence,
            max_iou,
        }
    }
}

impl Default for DetectParams {
    fn default() -> Self {
        Self::new(0.25, 0.7)
    }
}

/// Anything that finds objects in an RGB image.
///
/// Boxes are returned in pixel coordinates of `image`, ordered by sinking confidence.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &RgbImage, params: &DetectParams) -> Result<Vec<Detection>>;
}

/// YOLO model run on the tract runtime.
pub struct YoloModel {
    model: NnModel,
    input_size: u32,
}

impl YoloModel {
    /// Load and optimize the model at `path` for a square input of `input_size` pixels.
    pub fn new(path: impl AsRef<Path>, input_size: u32) -> Result<Self> {
        if input_size == 0 {
            bail!("model input size must be positive");
        }
        let model = get_yolo_model(path.as_ref(), input_size)?;
        Ok(Self { model, input_size })
    }

    fn preproc(&self, input: &RgbImage) -> (Tensor, Letterbox) {
        let (canvas, letterbox) = letterbox(input, self.input_size);
        let size = self.input_size as usize;

        let tensor: Tensor =
            tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
                canvas[(x as _, y as _)][c] as f32 / 255.0
            })
            .into();

        (tensor, letterbox)
    }
}

impl Detector for YoloModel {
    fn detect(&self, image: &RgbImage, params: &DetectParams) -> Result<Vec<Detection>> {
        let (width, height) = image.dimensions();
        let (input, letterbox) = self.preproc(image);

        let raw_nn_out = self.model.run(tvec!(input.into()))?;
        let output = match raw_nn_out.first() {
            Some(output) => output,
            None => bail!("model produced no output"),
        };
        log::debug!("Model output shape {:?}", output.shape());

        let candidates = decode_candidates(output, params.min_confidence)?;
        let detections = select_detections(candidates, params)
            .into_iter()
            .map(|detection| letterbox.restore(detection, width, height))
            .collect();

        Ok(detections)
    }
}

fn get_yolo_model(path: &Path, input_size: u32) -> Result<NnModel> {
    let size = input_size as usize;
    let input_fact = InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size));
    let model = tract_onnx::onnx()
        .model_for_path(path)?
        .with_input_fact(0, input_fact)?
        .into_optimized()?
        .into_runnable()?;

    Ok(model)
}

/// Placement of the original image inside the square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    /// Map a detection from model input coordinates back onto the original image.
    ///
    /// The box is clamped to `[0, width] x [0, height]` and its corners are ordered.
    pub fn restore(&self, detection: Detection, width: u32, height: u32) -> Detection {
        let [x_a, y_a, x_b, y_b] = detection.bbox;
        let to_x = |x: f32| ((x - self.pad_x) / self.scale).clamp(0.0, width as f32);
        let to_y = |y: f32| ((y - self.pad_y) / self.scale).clamp(0.0, height as f32);
        let (x_a, x_b) = (to_x(x_a), to_x(x_b));
        let (y_a, y_b) = (to_y(y_a), to_y(y_b));

        Detection {
            bbox: [
                x_a.min(x_b),
                y_a.min(y_b),
                x_a.max(x_b),
                y_a.max(y_b),
            ],
            ..detection
        }
    }
}

/// Resize `input` into a `size x size` canvas while keeping its aspect ratio.
///
/// The resized image is centered and the remaining border is filled with grey.
pub fn letterbox(input: &RgbImage, size: u32) -> (RgbImage, Letterbox) {
    let (width, height) = input.dimensions();
    let scale = f32::min(
        size as f32 / width.max(1) as f32,
        size as f32 / height.max(1) as f32,
    );
    let new_width = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_height = ((height as f32 * scale).round() as u32).clamp(1, size);

    let resized = image::imageops::resize(input, new_width, new_height, FilterType::Triangle);

    let pad_x = (size - new_width) / 2;
    let pad_y = (size - new_height) / 2;
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    image::imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    let letterbox = Letterbox {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
    };

    (canvas, letterbox)
}

/// Turn the raw `[1, 4 + C, N]` output into candidates with their best class.
///
/// Anchors whose best class score is below `min_confidence` are skipped early.
pub fn decode_candidates(output: &Tensor, min_confidence: f32) -> Result<Vec<Detection>> {
    let view = output.to_array_view::<f32>()?;
    let shape = view.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
        bail!("unexpected model output shape {:?}", shape);
    }
    let num_classes = shape[1] - 4;
    let num_anchors = shape[2];

    let mut candidates = Vec::new();
    for anchor in 0..num_anchors {
        let (class_id, confidence) = (0..num_classes)
            .map(|class_id| (class_id, view[[0, 4 + class_id, anchor]]))
            .fold((0, f32::MIN), |best, current| {
                if current.1 > best.1 {
                    current
                } else {
                    best
                }
            });

        if confidence < min_confidence {
            continue;
        }

        let (cx, cy) = (view[[0, 0, anchor]], view[[0, 1, anchor]]);
        let (w, h) = (view[[0, 2, anchor]], view[[0, 3, anchor]]);
        candidates.push(Detection {
            class_id,
            confidence,
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
        });
    }

    Ok(candidates)
}

/// Apply the confidence threshold and non-maximum suppression to candidate detections.
///
/// The result holds at most `MAX_DETECTIONS` detections ordered by sinking confidence.
pub fn select_detections(candidates: Vec<Detection>, params: &DetectParams) -> Vec<Detection> {
    let mut candidates: Vec<Detection> = candidates
        .into_iter()
        .filter(|candidate| candidate.confidence >= params.min_confidence)
        .collect();

    // Ascending order with ties in reverse, so popping from the back keeps the original order
    // among equally confident candidates.
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates.reverse();

    let mut selected = non_maximum_suppression(candidates, params.max_iou);
    selected.truncate(MAX_DETECTIONS);

    selected
}

/// Run non-maximum-suppression on candidate bounding boxes.
///
/// Start with the most confident bounding box and iterate over all other bounding boxes in the
/// order of sinking confidence. Grow the vector of selected bounding boxes by adding only those
/// candidates which do not have an IoU above `max_iou` with an already chosen bounding box of
/// the same class. Boxes of different classes never suppress each other.
fn non_maximum_suppression(mut sorted_candidates: Vec<Detection>, max_iou: f32) -> Vec<Detection> {
    let mut selected: Vec<Detection> = vec![];
    'candidates: loop {
        // Get next most confident detection from the back of ascending-sorted vector.
        match sorted_candidates.pop() {
            Some(candidate) => {
                for chosen in selected
                    .iter()
                    .filter(|chosen| chosen.class_id == candidate.class_id)
                {
                    if iou(&candidate.bbox, &chosen.bbox) > max_iou {
                        continue 'candidates;
                    }
                }

                selected.push(candidate)
            }
            None => break 'candidates,
        }
    }

    selected
}

/// Calculate the intersection-over-union metric for two bounding boxes.
pub fn iou(bbox_a: &Bbox, bbox_b: &Bbox) -> f32 {
    // If the boxes do not overlap, the corner points of the overlap box are ill defined and its
    // area is zero.
    let overlap_box: Bbox = [
        f32::max(bbox_a[0], bbox_b[0]),
        f32::max(bbox_a[1], bbox_b[1]),
        f32::min(bbox_a[2], bbox_b[2]),
        f32::min(bbox_a[3], bbox_b[3]),
    ];

    let overlap_area = bbox_area(&overlap_box);

    // Avoid division-by-zero with `EPS`
    overlap_area / (bbox_area(bbox_a) + bbox_area(bbox_b) - overlap_area + EPS)
}

/// Calculate the area enclosed by a bounding box.
///
/// If the bottom-right point lies above or to the left of the top-left point, the area is zero.
fn bbox_area(bbox: &Bbox) -> f32 {
    let width = bbox[2] - bbox[0];
    let height = bbox[3] - bbox[1];
    if width < 0.0 || height < 0.0 {
        return 0.0;
    }

    width * height
}
